//! Courses and their teaching sessions.
//!
//! A course is a named, ordered collection of sessions. A session is the
//! schedulable unit: it belongs to exactly one course, consumes `length`
//! consecutive slots, may demand exclusive use of a room (optionally with an
//! idle break before the room is reused), and may restrict its start times
//! with either a whitelist or a blacklist, never both.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::calendar::{DayId, SlotId};
use crate::models::person::PersonId;
use crate::models::room::RoomId;

/// Index of a course within its week model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseId(pub usize);

/// Index of a session within its week model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub usize);

/// A (day, slot) pattern. `None` on an axis widens it to "any".
pub type TimeSpec = (Option<DayId>, Option<SlotId>);

/// A named course owning an ordered list of sessions.
#[derive(Debug, Clone)]
pub struct Course {
    /// Course name as it appears in the problem description.
    pub name: String,
    sessions: Vec<SessionId>,
}

impl Course {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sessions: Vec::new(),
        }
    }

    pub(crate) fn push_session(&mut self, session: SessionId) {
        self.sessions.push(session);
    }

    /// Sessions of this course, in creation order.
    pub fn sessions(&self) -> &[SessionId] {
        &self.sessions
    }
}

/// A schedulable teaching session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Owning course.
    pub course: CourseId,
    /// Session type, e.g. "lecture" or "exercise". Free text.
    pub session_type: Option<String>,
    /// Optional display title.
    pub title: Option<String>,
    /// Group labels attending this session. Never empty.
    pub groups: BTreeSet<String>,
    /// Number of consecutive slots consumed. At least 1.
    pub length: usize,
    /// Room demanded for exclusive use, if any.
    pub room: Option<RoomId>,
    /// Minimum number of idle slots required in the room after this session
    /// before another session may use it.
    pub room_break: usize,
    students: BTreeSet<PersonId>,
    staff: BTreeSet<PersonId>,
    whitelist: Vec<TimeSpec>,
    blacklist: Vec<TimeSpec>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        course: CourseId,
        session_type: Option<String>,
        title: Option<String>,
        groups: BTreeSet<String>,
        length: usize,
        room: Option<RoomId>,
        room_break: usize,
    ) -> Self {
        Self {
            course,
            session_type,
            title,
            groups,
            length,
            room,
            room_break,
            students: BTreeSet::new(),
            staff: BTreeSet::new(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Students enrolled in this session.
    pub fn students(&self) -> &BTreeSet<PersonId> {
        &self.students
    }

    /// Staff teaching this session.
    pub fn staff(&self) -> &BTreeSet<PersonId> {
        &self.staff
    }

    /// All participants (students and staff), deduplicated, in id order.
    pub fn persons(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.students.union(&self.staff).copied()
    }

    /// Whether the person participates in this session in any role.
    pub fn has_person(&self, person: PersonId) -> bool {
        self.students.contains(&person) || self.staff.contains(&person)
    }

    /// Whether the person is enrolled as a student.
    pub fn has_student(&self, person: PersonId) -> bool {
        self.students.contains(&person)
    }

    /// Whether the person teaches this session.
    pub fn has_staff(&self, person: PersonId) -> bool {
        self.staff.contains(&person)
    }

    /// Allowed start times. Empty means unrestricted.
    pub fn whitelisted_times(&self) -> &[TimeSpec] {
        &self.whitelist
    }

    /// Forbidden occupied times. Empty means unrestricted.
    pub fn blacklisted_times(&self) -> &[TimeSpec] {
        &self.blacklist
    }

    pub(crate) fn add_student(&mut self, person: PersonId) {
        self.students.insert(person);
    }

    pub(crate) fn add_staff(&mut self, person: PersonId) {
        self.staff.insert(person);
    }

    pub(crate) fn whitelist_time(&mut self, time: TimeSpec, label: &str) -> Result<()> {
        if !self.blacklist.is_empty() {
            return Err(Error::Model(format!(
                "cannot whitelist a time for session {label} when it already has blacklisted times"
            )));
        }
        self.whitelist.push(time);
        Ok(())
    }

    pub(crate) fn blacklist_time(&mut self, time: TimeSpec, label: &str) -> Result<()> {
        if !self.whitelist.is_empty() {
            return Err(Error::Model(format!(
                "cannot blacklist a time for session {label} when it already has whitelisted times"
            )));
        }
        self.blacklist.push(time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            CourseId(0),
            Some("lecture".into()),
            None,
            BTreeSet::from(["A1".to_string()]),
            2,
            None,
            0,
        )
    }

    #[test]
    fn test_persons_merges_students_and_staff() {
        let mut s = session();
        s.add_student(PersonId(1));
        s.add_student(PersonId(3));
        s.add_staff(PersonId(2));
        s.add_staff(PersonId(3)); // also a student
        let persons: Vec<_> = s.persons().collect();
        assert_eq!(persons, vec![PersonId(1), PersonId(2), PersonId(3)]);
    }

    #[test]
    fn test_whitelist_blacklist_mutually_exclusive() {
        let mut s = session();
        s.whitelist_time((Some(DayId(0)), Some(SlotId(2))), "s").unwrap();
        let err = s.blacklist_time((None, Some(SlotId(0))), "s").unwrap_err();
        assert!(matches!(err, Error::Model(_)));

        let mut s = session();
        s.blacklist_time((None, None), "s").unwrap();
        assert!(s.whitelist_time((None, None), "s").is_err());
    }
}
