//! Hard feasibility modules.
//!
//! These decide whether a schedule exists at all: every session gets
//! exactly one start, time whitelists/blacklists are honored, rooms and
//! staff are never double-booked, and room idle breaks are respected.
//! None of them touch the objective.

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::models::{DayId, Model, SlotId};
use crate::solver::{LinExpr, MipSolver};

/// Exactly one start variable equals 1 per session.
pub struct SessionsScheduled;

impl Constraint for SessionsScheduled {
    fn name(&self) -> &'static str {
        "SessionsScheduled"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for session in model.session_ids() {
            let mut starts = LinExpr::new();
            for var in solver.assign_vars(None, None, Some(session)) {
                starts.add_term(1.0, var);
            }
            solver.add_equals_constr(
                starts,
                1.0,
                format!("{}-{}-SCHEDULED", self.name(), model.session_label(session)),
            );
        }
        Ok(())
    }
}

/// Sessions with whitelisted times must start inside the allowed set.
pub struct TimeWhitelist;

impl Constraint for TimeWhitelist {
    fn name(&self) -> &'static str {
        "TimeWhitelist"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for session in model.session_ids() {
            let whitelist = model.session(session).whitelisted_times().to_vec();
            if whitelist.is_empty() {
                continue;
            }

            let mut allowed = LinExpr::new();
            for (day_spec, slot_spec) in whitelist {
                let days: Vec<DayId> = match day_spec {
                    Some(day) => vec![day],
                    None => model.day_ids().collect(),
                };
                let slots: Vec<SlotId> = match slot_spec {
                    Some(slot) => vec![slot],
                    None => model.slot_ids().collect(),
                };
                for &day in &days {
                    for &slot in &slots {
                        if model.session_fits(session, slot) {
                            allowed.add_term(1.0, solver.start_var(day, slot, session));
                        }
                    }
                }
            }

            solver.add_equals_constr(
                allowed,
                1.0,
                format!("{}-{}", self.name(), model.session_label(session)),
            );
        }
        Ok(())
    }
}

/// No session may cover any of its blacklisted times. All violations are
/// aggregated into a single zero-sum constraint.
pub struct TimeBlacklist;

impl Constraint for TimeBlacklist {
    fn name(&self) -> &'static str {
        "TimeBlacklist"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        let mut forbidden = LinExpr::new();
        for session in model.session_ids() {
            for &(day, slot) in model.session(session).blacklisted_times() {
                for var in solver.assign_vars(day, slot, Some(session)) {
                    forbidden.add_term(1.0, var);
                }
            }
        }

        if !forbidden.is_empty() {
            solver.add_equals_constr(forbidden, 0.0, self.name());
        }
        Ok(())
    }
}

/// At most one session covering any (day, slot) per room.
pub struct NoRoomConflicts;

impl Constraint for NoRoomConflicts {
    fn name(&self) -> &'static str {
        "NoRoomConflicts"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for day in model.day_ids() {
            for slot in model.slot_ids() {
                for room in model.room_ids() {
                    let mut occupied = LinExpr::new();
                    for session in model.session_ids() {
                        if model.session(session).room == Some(room) {
                            for var in solver.assign_vars(Some(day), Some(slot), Some(session)) {
                                occupied.add_term(1.0, var);
                            }
                        }
                    }

                    if occupied.term_count() > 1 {
                        solver.add_less_equals_constr(
                            occupied,
                            1.0,
                            format!(
                                "{}-{}-{}-{}",
                                self.name(),
                                model.day(day).name,
                                model.slot(slot).label(),
                                model.room(room).name
                            ),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// A person staffing several sessions may cover at most one of them at any
/// (day, slot). Overlap between a person's staff and student sessions is
/// deliberately not forbidden here; that is penalized softly.
pub struct NoStaffConflicts;

impl Constraint for NoStaffConflicts {
    fn name(&self) -> &'static str {
        "NoStaffConflicts"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for person in model.person_ids() {
            let staff_sessions = model.person(person).staff_sessions();
            if staff_sessions.len() < 2 {
                continue;
            }
            for day in model.day_ids() {
                for slot in model.slot_ids() {
                    let mut teaching = LinExpr::new();
                    for &session in staff_sessions {
                        for var in solver.assign_vars(Some(day), Some(slot), Some(session)) {
                            teaching.add_term(1.0, var);
                        }
                    }
                    solver.add_less_equals_constr(
                        teaching,
                        1.0,
                        format!(
                            "{}-{}-{}-{}",
                            self.name(),
                            model.person(person).name,
                            model.day(day).name,
                            model.slot(slot).label()
                        ),
                    );
                }
            }
        }
        Ok(())
    }
}

/// After a session with a room-break requirement, no same-room session may
/// start within the break window following its occupied range.
pub struct RoomBreaks;

impl Constraint for RoomBreaks {
    fn name(&self) -> &'static str {
        "RoomBreaks"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for session in model.session_ids() {
            let details = model.session(session);
            if details.room_break == 0 {
                continue;
            }
            let Some(room) = details.room else {
                return Err(Error::Model(format!(
                    "room breaks cannot be enforced for session {} without a room assigned",
                    model.session_label(session)
                )));
            };
            let room_break = details.room_break;
            let length = details.length;

            for day in model.day_ids() {
                for slot in model.slots_for(session) {
                    // If the session starts here, its break window follows
                    // the occupied range.
                    let mut window = LinExpr::new();
                    window.add_term(1.0, solver.start_var(day, slot, session));
                    let mut break_slots_done = 0;

                    let mut break_slot = model.next_slot_by(slot, length);
                    while let Some(current) = break_slot {
                        if !model.session_fits(session, current) || break_slots_done == room_break
                        {
                            break;
                        }
                        for other in model.session_ids() {
                            if model.session(other).room == Some(room)
                                && model.session_fits(other, current)
                            {
                                window.add_term(1.0, solver.start_var(day, current, other));
                            }
                        }
                        break_slots_done += 1;
                        break_slot = model.next_slot(current);
                    }

                    if window.term_count() > 1 {
                        solver.add_less_equals_constr(
                            window,
                            1.0,
                            format!(
                                "{}-{}-{}-{}",
                                self.name(),
                                model.session_label(session),
                                model.day(day).name,
                                model.slot(slot).label()
                            ),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// Forbids any assignment covering the listed days.
pub struct DayBlacklist {
    days: Vec<DayId>,
}

impl DayBlacklist {
    pub fn new(days: Vec<DayId>) -> Self {
        Self { days }
    }
}

impl Constraint for DayBlacklist {
    fn name(&self) -> &'static str {
        "DayBlacklist"
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for &day in &self.days {
            let mut covered = LinExpr::new();
            for var in solver.assign_vars(Some(day), None, None) {
                covered.add_term(1.0, var);
            }
            solver.add_less_equals_constr(
                covered,
                0.0,
                format!("{}-{}", self.name(), model.day(day).name),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::{RoomId, SessionId};
    use crate::solver::{SolveConfig, SolveOutcome};

    pub(crate) fn week(days: &[&str], slots: usize) -> Model {
        let mut model = Model::new(0, 8);
        model.add_days(days);
        model.add_slots(slots);
        model
    }

    pub(crate) fn add_session(model: &mut Model, course: &str, length: usize) -> SessionId {
        let course = model.find_add_course(course);
        let session = model.add_session(
            course,
            Some("lecture".into()),
            None,
            BTreeSet::from(["G1".to_string()]),
            length,
            None,
            0,
        );
        let student = model.find_add_person("Student");
        model.add_student(session, student);
        session
    }

    pub(crate) fn solve(
        model: &Model,
        mut modules: Vec<Box<dyn Constraint + '_>>,
    ) -> (MipSolver, SolveOutcome) {
        let mut solver = MipSolver::new(model);
        let config = SolveConfig::default().quiet();
        let outcome = solver
            .solve(model, &mut modules, &mut [], &config)
            .unwrap();
        (solver, outcome)
    }

    #[test]
    fn test_whitelisted_session_is_pinned() {
        let mut model = week(&["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"], 6);
        let session = add_session(&mut model, "Algebra", 2);
        let monday = model.find_day("Monday").unwrap();
        model
            .whitelist_time(session, (Some(monday), Some(SlotId(3))))
            .unwrap();

        let (solver, outcome) = solve(
            &model,
            vec![Box::new(SessionsScheduled), Box::new(TimeWhitelist)],
        );

        match outcome {
            SolveOutcome::Solved { objective, .. } => assert!(objective.abs() < 1e-6),
            other => panic!("expected a schedule, got {other:?}"),
        }
        assert!(solver.is_scheduled_at(monday, SlotId(3), session));
        for day in model.day_ids() {
            for slot in model.slots_for(session) {
                if (day, slot) != (monday, SlotId(3)) {
                    assert!(!solver.is_scheduled_at(day, slot, session));
                }
            }
        }
    }

    #[test]
    fn test_fully_blacklisted_session_is_infeasible() {
        let mut model = week(&["Monday", "Tuesday"], 3);
        let session = add_session(&mut model, "Algebra", 1);
        model.blacklist_time(session, (None, None)).unwrap();

        let (_, outcome) = solve(
            &model,
            vec![Box::new(SessionsScheduled), Box::new(TimeBlacklist)],
        );
        assert_eq!(outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_blacklist_redirects_start() {
        let mut model = week(&["Monday"], 2);
        let session = add_session(&mut model, "Algebra", 1);
        model
            .blacklist_time(session, (None, Some(SlotId(0))))
            .unwrap();

        let (solver, outcome) = solve(
            &model,
            vec![Box::new(SessionsScheduled), Box::new(TimeBlacklist)],
        );
        assert!(outcome.is_solved());
        assert!(solver.is_scheduled_at(DayId(0), SlotId(1), session));
    }

    #[test]
    fn test_room_conflicts_forbid_overlap() {
        let mut model = week(&["Monday"], 2);
        model.add_room("Lab");
        let student = model.find_add_person("Student");
        for name in ["Algebra", "Biology"] {
            let course = model.find_add_course(name);
            let session = model.add_session(
                course,
                None,
                None,
                BTreeSet::from(["G1".to_string()]),
                1,
                Some(RoomId(0)),
                0,
            );
            model.add_student(session, student);
        }

        let (solver, outcome) = solve(
            &model,
            vec![Box::new(SessionsScheduled), Box::new(NoRoomConflicts)],
        );
        assert!(outcome.is_solved());
        let map = solver.scheduling_map();
        assert_ne!(map[&SessionId(0)], map[&SessionId(1)]);
    }

    #[test]
    fn test_staff_conflicts_forbid_overlap() {
        let mut model = week(&["Monday"], 2);
        let a = add_session(&mut model, "Algebra", 1);
        let b = add_session(&mut model, "Biology", 1);
        let teacher = model.find_add_person("Teacher");
        model.add_staff(a, teacher);
        model.add_staff(b, teacher);

        let (solver, outcome) = solve(
            &model,
            vec![Box::new(SessionsScheduled), Box::new(NoStaffConflicts)],
        );
        assert!(outcome.is_solved());
        let map = solver.scheduling_map();
        assert_ne!(map[&a].1, map[&b].1);
    }

    #[test]
    fn test_room_break_forbids_adjacent_ordering() {
        // Two 1-slot sessions in the same room, 2 slots in the day, and a
        // 1-slot break after the first session: only "b then a" fits.
        let mut model = week(&["Monday"], 2);
        model.add_room("Lab");
        let course = model.find_add_course("Algebra");
        let student = model.find_add_person("Student");
        let groups = BTreeSet::from(["G1".to_string()]);
        let a = model.add_session(course, None, None, groups.clone(), 1, Some(RoomId(0)), 1);
        let b = model.add_session(course, None, None, groups, 1, Some(RoomId(0)), 0);
        model.add_student(a, student);
        model.add_student(b, student);

        let (solver, outcome) = solve(
            &model,
            vec![
                Box::new(SessionsScheduled),
                Box::new(NoRoomConflicts),
                Box::new(RoomBreaks),
            ],
        );
        assert!(outcome.is_solved());
        let map = solver.scheduling_map();
        assert_eq!(map[&b], (DayId(0), SlotId(0)));
        assert_eq!(map[&a], (DayId(0), SlotId(1)));
    }

    #[test]
    fn test_mutual_room_breaks_are_infeasible() {
        let mut model = week(&["Monday"], 2);
        model.add_room("Lab");
        let course = model.find_add_course("Algebra");
        let student = model.find_add_person("Student");
        let groups = BTreeSet::from(["G1".to_string()]);
        for _ in 0..2 {
            let session =
                model.add_session(course, None, None, groups.clone(), 1, Some(RoomId(0)), 1);
            model.add_student(session, student);
        }

        let (_, outcome) = solve(
            &model,
            vec![
                Box::new(SessionsScheduled),
                Box::new(NoRoomConflicts),
                Box::new(RoomBreaks),
            ],
        );
        assert_eq!(outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_room_break_without_room_is_an_error() {
        let mut model = week(&["Monday"], 2);
        let course = model.find_add_course("Algebra");
        let student = model.find_add_person("Student");
        let session = model.add_session(
            course,
            None,
            None,
            BTreeSet::from(["G1".to_string()]),
            1,
            None,
            1,
        );
        model.add_student(session, student);

        let mut solver = MipSolver::new(&model);
        let mut modules: Vec<Box<dyn Constraint>> = vec![Box::new(RoomBreaks)];
        let config = SolveConfig::default().quiet();
        let err = solver
            .solve(&model, &mut modules, &mut [], &config)
            .unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn test_day_blacklist_moves_sessions_off_day() {
        let mut model = week(&["Monday", "Tuesday"], 1);
        let session = add_session(&mut model, "Algebra", 1);
        let monday = model.find_day("Monday").unwrap();

        let (solver, outcome) = solve(
            &model,
            vec![
                Box::new(SessionsScheduled),
                Box::new(DayBlacklist::new(vec![monday])),
            ],
        );
        assert!(outcome.is_solved());
        assert!(solver.is_scheduled_at(DayId(1), SlotId(0), session));
    }
}
