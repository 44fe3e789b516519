//! People: students and staff.
//!
//! A person never owns sessions. Membership, per-course grouping and the
//! staff subset are all derived from the registrations made through
//! [`Model::add_student`](crate::models::Model::add_student) and
//! [`Model::add_staff`](crate::models::Model::add_staff).

use std::collections::{BTreeMap, BTreeSet};

use crate::models::course::{CourseId, SessionId};

/// Index of a person within its week model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub usize);

/// A student or staff member.
#[derive(Debug, Clone)]
pub struct Person {
    /// Person name as it appears in the problem description.
    pub name: String,
    /// Scales every penalty and bonus attributable to this person.
    pub weight: f64,
    sessions: BTreeSet<SessionId>,
    staff_sessions: BTreeSet<SessionId>,
    sessions_by_course: BTreeMap<CourseId, Vec<SessionId>>,
}

impl Person {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            sessions: BTreeSet::new(),
            staff_sessions: BTreeSet::new(),
            sessions_by_course: BTreeMap::new(),
        }
    }

    /// Every session this person participates in, in any role.
    pub fn sessions(&self) -> &BTreeSet<SessionId> {
        &self.sessions
    }

    /// The subset of sessions where this person is staff.
    pub fn staff_sessions(&self) -> &BTreeSet<SessionId> {
        &self.staff_sessions
    }

    /// Courses this person participates in.
    pub fn courses(&self) -> impl Iterator<Item = CourseId> + '_ {
        self.sessions_by_course.keys().copied()
    }

    /// This person's sessions for one course, in registration order.
    /// Empty for a course the person does not attend.
    pub fn sessions_by_course(&self, course: CourseId) -> &[SessionId] {
        self.sessions_by_course
            .get(&course)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn register_session(
        &mut self,
        session: SessionId,
        course: CourseId,
        as_staff: bool,
    ) {
        // A person may hold both roles in one session; track it once.
        if self.sessions.insert(session) {
            self.sessions_by_course
                .entry(course)
                .or_default()
                .push(session);
        }
        if as_staff {
            self.staff_sessions.insert(session);
        }
    }
}
