//! Accepted per-week schedules.
//!
//! A [`Solution`] freezes one week's model together with the start time
//! chosen for each of its sessions. It deliberately exposes only name-based
//! queries: a later week's constraints must never reach into an unrelated
//! week's model, where course or person scope could be confused.

use std::collections::BTreeMap;

use crate::models::calendar::{DayId, SlotId};
use crate::models::course::SessionId;
use crate::models::model::Model;

/// An immutable record of one solved week.
#[derive(Debug)]
pub struct Solution {
    model: Model,
    schedule: BTreeMap<SessionId, (DayId, SlotId)>,
}

impl Solution {
    /// Wraps a solved week. `schedule` maps every session to its start.
    pub fn new(model: Model, schedule: BTreeMap<SessionId, (DayId, SlotId)>) -> Self {
        Self { model, schedule }
    }

    /// Week number this solution schedules.
    pub fn week(&self) -> u32 {
        self.model.week
    }

    /// Whether the named person attends any session of the named course.
    /// Unknown names answer `false`.
    pub fn attends(&self, person_name: &str, course_name: &str) -> bool {
        let (Some(person), Some(course)) = (
            self.model.find_person(person_name),
            self.model.find_course(course_name),
        ) else {
            return false;
        };
        !self.model.person(person).sessions_by_course(course).is_empty()
    }

    /// Types of the person's sessions for the course that start exactly at
    /// the given day and hour. Unknown names or times answer empty.
    pub fn session_types_scheduled(
        &self,
        person_name: &str,
        course_name: &str,
        day_name: &str,
        start_hour: u32,
    ) -> Vec<Option<&str>> {
        let (Some(person), Some(course), Some(day), Some(slot)) = (
            self.model.find_person(person_name),
            self.model.find_course(course_name),
            self.model.find_day(day_name),
            self.model.find_slot(start_hour),
        ) else {
            return Vec::new();
        };

        self.model
            .person(person)
            .sessions_by_course(course)
            .iter()
            .filter(|s| self.schedule.get(s) == Some(&(day, slot)))
            .map(|&s| self.model.session(s).session_type.as_deref())
            .collect()
    }
}
