//! One week's timetabling model.
//!
//! Owns the full day/slot/room/course/session/person collections for a
//! single week and provides the positional indexing and name lookups every
//! other layer builds on. All collections are append-only during problem
//! construction and must be frozen before solving begins.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::calendar::{Day, DayId, Slot, SlotId};
use crate::models::course::{Course, CourseId, Session, SessionId, TimeSpec};
use crate::models::person::{Person, PersonId};
use crate::models::room::{Room, RoomId};

/// The complete timetabling model for one week.
#[derive(Debug, Clone)]
pub struct Model {
    /// Week number this model schedules.
    pub week: u32,
    /// Display name, e.g. "Week 37".
    pub model_name: String,
    /// Hour of day at which the first slot begins.
    pub start_hour: u32,
    days: Vec<Day>,
    slots: Vec<Slot>,
    rooms: Vec<Room>,
    courses: Vec<Course>,
    sessions: Vec<Session>,
    persons: Vec<Person>,
}

impl Model {
    /// Creates an empty model for the given week.
    pub fn new(week: u32, start_hour: u32) -> Self {
        Self {
            week,
            model_name: format!("Week {week}"),
            start_hour,
            days: Vec::new(),
            slots: Vec::new(),
            rooms: Vec::new(),
            courses: Vec::new(),
            sessions: Vec::new(),
            persons: Vec::new(),
        }
    }

    // --- days ---

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn day_ids(&self) -> impl Iterator<Item = DayId> {
        (0..self.days.len()).map(DayId)
    }

    pub fn day(&self, id: DayId) -> &Day {
        &self.days[id.0]
    }

    pub fn add_day(&mut self, name: impl Into<String>) {
        self.days.push(Day::new(name));
    }

    pub fn add_days<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) {
        for name in names {
            self.add_day(name.as_ref());
        }
    }

    /// Case-insensitive day lookup.
    pub fn find_day(&self, name: &str) -> Option<DayId> {
        self.days
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .map(DayId)
    }

    pub fn previous_day(&self, day: DayId) -> Option<DayId> {
        day.0.checked_sub(1).map(DayId)
    }

    pub fn next_day(&self, day: DayId) -> Option<DayId> {
        (day.0 + 1 < self.days.len()).then(|| DayId(day.0 + 1))
    }

    // --- slots ---

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> {
        (0..self.slots.len()).map(SlotId)
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.0]
    }

    /// Appends a one-hour slot directly after the last existing slot.
    pub fn add_slot(&mut self) {
        let start = match self.slots.last() {
            Some(last) => last.end_hour,
            None => self.start_hour,
        };
        self.slots.push(Slot::new(start, start + 1));
    }

    pub fn add_slots(&mut self, count: usize) {
        for _ in 0..count {
            self.add_slot();
        }
    }

    /// Finds the slot beginning at the given hour.
    pub fn find_slot(&self, start_hour: u32) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| s.start_hour == start_hour)
            .map(SlotId)
    }

    pub fn previous_slot(&self, slot: SlotId) -> Option<SlotId> {
        slot.0.checked_sub(1).map(SlotId)
    }

    pub fn next_slot(&self, slot: SlotId) -> Option<SlotId> {
        (slot.0 + 1 < self.slots.len()).then(|| SlotId(slot.0 + 1))
    }

    /// The slot `offset` positions after the given one, if it exists.
    pub fn next_slot_by(&self, slot: SlotId, offset: usize) -> Option<SlotId> {
        (slot.0 + offset < self.slots.len()).then(|| SlotId(slot.0 + offset))
    }

    // --- rooms ---

    pub fn room_ids(&self) -> impl Iterator<Item = RoomId> {
        (0..self.rooms.len()).map(RoomId)
    }

    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.0]
    }

    pub fn add_room(&mut self, name: impl Into<String>) {
        self.rooms.push(Room::new(name));
    }

    pub fn add_rooms<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) {
        for name in names {
            self.add_room(name.as_ref());
        }
    }

    /// Case-insensitive room lookup. An unknown room is a model error:
    /// rooms are declared up front, never discovered from the input.
    pub fn find_room(&self, name: &str) -> Result<RoomId> {
        self.rooms
            .iter()
            .position(|r| r.name.eq_ignore_ascii_case(name))
            .map(RoomId)
            .ok_or_else(|| Error::Model(format!("unknown room '{name}' specified")))
    }

    // --- courses ---

    pub fn course_ids(&self) -> impl Iterator<Item = CourseId> {
        (0..self.courses.len()).map(CourseId)
    }

    pub fn course(&self, id: CourseId) -> &Course {
        &self.courses[id.0]
    }

    pub fn add_course(&mut self, name: impl Into<String>) -> CourseId {
        let id = CourseId(self.courses.len());
        self.courses.push(Course::new(name));
        id
    }

    /// Case-insensitive course lookup.
    pub fn find_course(&self, name: &str) -> Option<CourseId> {
        self.courses
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(CourseId)
    }

    /// Looks the course up by name, creating it on a miss.
    pub fn find_add_course(&mut self, name: &str) -> CourseId {
        match self.find_course(name) {
            Some(id) => id,
            None => self.add_course(name),
        }
    }

    /// Sessions of a course restricted to one group label; `None` returns
    /// them all.
    pub fn sessions_in_group(&self, course: CourseId, group: Option<&str>) -> Vec<SessionId> {
        self.course(course)
            .sessions()
            .iter()
            .copied()
            .filter(|&s| match group {
                Some(g) => self.session(s).groups.contains(g),
                None => true,
            })
            .collect()
    }

    // --- persons ---

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    pub fn person_ids(&self) -> impl Iterator<Item = PersonId> {
        (0..self.persons.len()).map(PersonId)
    }

    pub fn person(&self, id: PersonId) -> &Person {
        &self.persons[id.0]
    }

    pub fn add_person(&mut self, name: impl Into<String>) -> PersonId {
        let id = PersonId(self.persons.len());
        self.persons.push(Person::new(name));
        id
    }

    /// Case-insensitive person lookup.
    pub fn find_person(&self, name: &str) -> Option<PersonId> {
        self.persons
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .map(PersonId)
    }

    /// Looks the person up by name, creating them on a miss.
    pub fn find_add_person(&mut self, name: &str) -> PersonId {
        match self.find_person(name) {
            Some(id) => id,
            None => self.add_person(name),
        }
    }

    pub fn set_person_weight(&mut self, person: PersonId, weight: f64) {
        self.persons[person.0].weight = weight;
    }

    // --- sessions ---

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = SessionId> {
        (0..self.sessions.len()).map(SessionId)
    }

    pub fn session(&self, id: SessionId) -> &Session {
        &self.sessions[id.0]
    }

    /// Creates a session and appends it to its course.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn add_session(
        &mut self,
        course: CourseId,
        session_type: Option<String>,
        title: Option<String>,
        groups: BTreeSet<String>,
        length: usize,
        room: Option<RoomId>,
        room_break: usize,
    ) -> SessionId {
        assert!(length >= 1, "session length must be at least 1");
        let id = SessionId(self.sessions.len());
        self.sessions.push(Session::new(
            course,
            session_type,
            title,
            groups,
            length,
            room,
            room_break,
        ));
        self.courses[course.0].push_session(id);
        id
    }

    /// Enrolls a student, maintaining the person-side back-references.
    pub fn add_student(&mut self, session: SessionId, person: PersonId) {
        let course = self.sessions[session.0].course;
        self.sessions[session.0].add_student(person);
        self.persons[person.0].register_session(session, course, false);
    }

    /// Assigns staff, maintaining the person-side back-references.
    pub fn add_staff(&mut self, session: SessionId, person: PersonId) {
        let course = self.sessions[session.0].course;
        self.sessions[session.0].add_staff(person);
        self.persons[person.0].register_session(session, course, true);
    }

    /// Restricts a session's start to the given time pattern.
    pub fn whitelist_time(&mut self, session: SessionId, time: TimeSpec) -> Result<()> {
        let label = self.session_label(session);
        self.sessions[session.0].whitelist_time(time, &label)
    }

    /// Forbids a session from occupying the given time pattern.
    pub fn blacklist_time(&mut self, session: SessionId, time: TimeSpec) -> Result<()> {
        let label = self.session_label(session);
        self.sessions[session.0].blacklist_time(time, &label)
    }

    /// Valid start positions for a session: every slot from which its full
    /// length still fits within the day.
    pub fn slots_for(&self, session: SessionId) -> impl Iterator<Item = SlotId> {
        let length = self.sessions[session.0].length;
        let fitting = (self.slots.len() + 1).saturating_sub(length);
        (0..fitting).map(SlotId)
    }

    /// Whether the session fits when started at the given slot.
    pub fn session_fits(&self, session: SessionId, start: SlotId) -> bool {
        start.0 + self.sessions[session.0].length <= self.slots.len()
    }

    /// Sum of all participants' weights for a session.
    pub fn session_person_weight(&self, session: SessionId) -> f64 {
        self.sessions[session.0]
            .persons()
            .map(|p| self.persons[p.0].weight)
            .sum()
    }

    /// A person's student-role sessions, grouped per course.
    ///
    /// Each inner vector holds the sessions of one course in which the
    /// person is enrolled as a student (staff-only sessions are filtered
    /// out; a group may come out empty).
    pub fn student_sessions_by_course(&self, person: PersonId) -> Vec<Vec<SessionId>> {
        self.persons[person.0]
            .courses()
            .map(|course| {
                self.persons[person.0]
                    .sessions_by_course(course)
                    .iter()
                    .copied()
                    .filter(|&s| self.sessions[s.0].has_student(person))
                    .collect()
            })
            .collect()
    }

    /// Diagnostic label for a session: course, type and groups.
    pub fn session_label(&self, session: SessionId) -> String {
        let s = &self.sessions[session.0];
        let groups: Vec<&str> = s.groups.iter().map(String::as_str).collect();
        format!(
            "{}-{}-[{}]",
            self.courses[s.course.0].name,
            s.session_type.as_deref().unwrap_or("?"),
            groups.join(",")
        )
    }

    /// Checks that the model is complete enough to solve.
    pub fn assert_valid(&self) -> Result<()> {
        if self.days.is_empty()
            || self.slots.is_empty()
            || self.courses.is_empty()
            || self.sessions.is_empty()
            || self.persons.is_empty()
        {
            return Err(Error::Model(format!(
                "{} is missing days, slots, courses, sessions or persons",
                self.model_name
            )));
        }
        Ok(())
    }
}
