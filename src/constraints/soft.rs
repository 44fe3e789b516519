//! Soft preference modules.
//!
//! Each module turns a scheduling preference into weighted objective
//! terms. The constructor argument is the per-unit penalty; wherever a
//! person is affected, the term is additionally scaled by that person's
//! weight.

use std::collections::BTreeMap;

use crate::constraints::Constraint;
use crate::error::Result;
use crate::models::{DayId, Model, SlotId};
use crate::solver::{LinExpr, MipSolver, VarId};

/// Penalizes overlapping sessions per person.
///
/// Soft rather than hard: a student may simply have signed up for more
/// courses than fit, and that must not make the week unsolvable. Both
/// student and staff sessions count, so a staff member overlapping their
/// own student session is penalized here; staff/staff overlap is already
/// forbidden outright.
pub struct PersonConflicts {
    penalty: f64,
    overlaps: Vec<Vec<Vec<VarId>>>, // [person][day][slot]
}

impl PersonConflicts {
    pub fn new(penalty_per_conflict: f64) -> Self {
        Self {
            penalty: penalty_per_conflict,
            overlaps: Vec::new(),
        }
    }
}

impl Constraint for PersonConflicts {
    fn name(&self) -> &'static str {
        "PersonConflicts"
    }

    fn add_variables(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        self.overlaps = model
            .person_ids()
            .map(|person| {
                model
                    .day_ids()
                    .map(|day| {
                        model
                            .slot_ids()
                            .map(|slot| {
                                solver.add_integer_var(
                                    0.0,
                                    None,
                                    format!(
                                        "{}-{}-{}-{}",
                                        self.name(),
                                        model.person(person).name,
                                        model.day(day).name,
                                        model.slot(slot).label()
                                    ),
                                )
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(())
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for person in model.person_ids() {
            for day in model.day_ids() {
                for slot in model.slot_ids() {
                    let mut occupied = LinExpr::new();
                    for &session in model.person(person).sessions() {
                        for var in solver.assign_vars(Some(day), Some(slot), Some(session)) {
                            occupied.add_term(1.0, var);
                        }
                    }

                    // The surplus variable absorbs everything beyond one
                    // simultaneous session.
                    let mut limit = LinExpr::from(1.0);
                    limit.add_term(1.0, self.overlaps[person.0][day.0][slot.0]);
                    solver.add_less_equals_constr(
                        occupied,
                        limit,
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

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for person in model.person_ids() {
            for day in model.day_ids() {
                for slot in model.slot_ids() {
                    solver.add_objective(
                        model.person(person).weight * self.penalty,
                        self.overlaps[person.0][day.0][slot.0],
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

/// Keeps multi-slot sessions aligned to the hour grid: a 2-slot session
/// should start at an even position, a 3-slot session at a position
/// divisible by 3.
pub struct UnalignedAllocation {
    penalty: f64,
}

impl UnalignedAllocation {
    pub fn new(penalty: f64) -> Self {
        Self { penalty }
    }
}

impl Constraint for UnalignedAllocation {
    fn name(&self) -> &'static str {
        "UnalignedAllocation"
    }

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for session in model.session_ids() {
            let length = model.session(session).length;
            for day in model.day_ids() {
                for slot in model.slots_for(session) {
                    let unaligned = (length == 2 && slot.0 % 2 != 0)
                        || (length == 3 && slot.0 % 3 != 0);
                    if unaligned {
                        solver.add_objective(
                            self.penalty,
                            solver.start_var(day, slot, session),
                            format!(
                                "{}-{}-{}-{}",
                                self.name(),
                                model.day(day).name,
                                model.slot(slot).label(),
                                model.session_label(session)
                            ),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// Penalizes sessions covering undesired (day, slot) cells.
///
/// Entries with `None` for day or slot apply to the whole row or column;
/// overlapping entries accumulate. Each term is scaled by the sum of the
/// session's participant weights.
pub struct UndesiredTimes {
    penalties: BTreeMap<(DayId, SlotId), f64>,
}

impl UndesiredTimes {
    pub fn new(model: &Model, entries: &[(Option<DayId>, Option<SlotId>, f64)]) -> Self {
        let mut penalties: BTreeMap<(DayId, SlotId), f64> = BTreeMap::new();
        for &(day_spec, slot_spec, penalty) in entries {
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
                    *penalties.entry((day, slot)).or_insert(0.0) += penalty;
                }
            }
        }
        Self { penalties }
    }
}

impl Constraint for UndesiredTimes {
    fn name(&self) -> &'static str {
        "UndesiredTimes"
    }

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for (&(day, slot), &penalty) in &self.penalties {
            for session in model.session_ids() {
                let weight = penalty * model.session_person_weight(session);
                for var in solver.assign_vars(Some(day), Some(slot), Some(session)) {
                    solver.add_objective(
                        weight,
                        var,
                        format!(
                            "{}-{}-{}-{}",
                            self.name(),
                            model.day(day).name,
                            model.slot(slot).label(),
                            model.session_label(session)
                        ),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Penalizes days on which a person has every designated lunch slot
/// occupied.
///
/// One busy indicator per (person, day, lunch slot) is forced to 1 by any
/// occupancy of that slot; a denial indicator is forced to 1 only when all
/// of the day's busy indicators are.
pub struct NoLunchBreaks {
    lunch_slots: Vec<SlotId>,
    penalty: f64,
    busy: Vec<Vec<Vec<VarId>>>, // [person][day][lunch slot]
    denials: Vec<Vec<VarId>>,   // [person][day]
}

impl NoLunchBreaks {
    pub fn new(lunch_slots: Vec<SlotId>, penalty_per_denial: f64) -> Self {
        Self {
            lunch_slots,
            penalty: penalty_per_denial,
            busy: Vec::new(),
            denials: Vec::new(),
        }
    }
}

impl Constraint for NoLunchBreaks {
    fn name(&self) -> &'static str {
        "NoLunchBreaks"
    }

    fn add_variables(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        if self.lunch_slots.is_empty() {
            return Ok(());
        }
        self.busy = model
            .person_ids()
            .map(|person| {
                model
                    .day_ids()
                    .map(|day| {
                        self.lunch_slots
                            .iter()
                            .map(|slot| {
                                solver.add_binary_var(format!(
                                    "{}-BUSY-{}-{}-{}",
                                    self.name(),
                                    model.person(person).name,
                                    model.day(day).name,
                                    model.slot(*slot).label()
                                ))
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        self.denials = model
            .person_ids()
            .map(|person| {
                model
                    .day_ids()
                    .map(|day| {
                        solver.add_binary_var(format!(
                            "{}-{}-{}",
                            self.name(),
                            model.person(person).name,
                            model.day(day).name
                        ))
                    })
                    .collect()
            })
            .collect();
        Ok(())
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        if self.lunch_slots.is_empty() {
            return Ok(());
        }
        for person in model.person_ids() {
            let session_count = model.person(person).sessions().len();
            for day in model.day_ids() {
                // Any occupancy of a lunch slot trips its busy indicator.
                // One indicator per slot: a shared one would miss a person
                // with overlap in some slots but a hole in another.
                for (lunch_index, &slot) in self.lunch_slots.iter().enumerate() {
                    let mut occupied = LinExpr::new();
                    for &session in model.person(person).sessions() {
                        for var in solver.assign_vars(Some(day), Some(slot), Some(session)) {
                            occupied.add_term(1.0, var);
                        }
                    }

                    let mut tripwire = LinExpr::new();
                    tripwire.add_term(
                        session_count as f64,
                        self.busy[person.0][day.0][lunch_index],
                    );
                    solver.add_less_equals_constr(
                        occupied,
                        tripwire,
                        format!(
                            "{}-Busy-{}-{}-{}",
                            self.name(),
                            model.person(person).name,
                            model.day(day).name,
                            model.slot(slot).label()
                        ),
                    );
                }

                // The denial indicator must be 1 once every busy indicator is.
                let mut busy_sum = LinExpr::new();
                for lunch_index in 0..self.lunch_slots.len() {
                    busy_sum.add_term(1.0, self.busy[person.0][day.0][lunch_index]);
                }
                let mut denial = LinExpr::from(self.lunch_slots.len() as f64 - 1.0);
                denial.add_term(1.0, self.denials[person.0][day.0]);
                solver.add_less_equals_constr(
                    busy_sum,
                    denial,
                    format!(
                        "{}-Denial-{}-{}",
                        self.name(),
                        model.person(person).name,
                        model.day(day).name
                    ),
                );
            }
        }
        Ok(())
    }

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        if self.lunch_slots.is_empty() {
            return Ok(());
        }
        for person in model.person_ids() {
            for day in model.day_ids() {
                solver.add_objective(
                    model.person(person).weight * self.penalty,
                    self.denials[person.0][day.0],
                    format!(
                        "{}-{}-{}",
                        self.name(),
                        model.person(person).name,
                        model.day(day).name
                    ),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::constraints::hard::tests::{add_session, solve, week};
    use crate::constraints::{SessionsScheduled, TimeWhitelist};
    use crate::solver::SolveOutcome;

    fn objective(outcome: SolveOutcome) -> f64 {
        match outcome {
            SolveOutcome::Solved { objective, .. } => objective,
            other => panic!("expected a schedule, got {other:?}"),
        }
    }

    #[test]
    fn test_person_conflict_costs_penalty_times_weight() {
        // One slot, two sessions, one student: overlap is unavoidable.
        let mut model = week(&["Monday"], 1);
        add_session(&mut model, "Algebra", 1);
        add_session(&mut model, "Biology", 1);

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(PersonConflicts::new(32.0)),
        ];
        let (_, outcome) = solve(&model, modules);
        assert!((objective(outcome) - 32.0).abs() < 1e-6);

        let student = model.find_person("Student").unwrap();
        model.set_person_weight(student, 2.0);
        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(PersonConflicts::new(32.0)),
        ];
        let (_, outcome) = solve(&model, modules);
        assert!((objective(outcome) - 64.0).abs() < 1e-6);
    }

    #[test]
    fn test_person_conflicts_avoided_when_possible() {
        let mut model = week(&["Monday"], 2);
        add_session(&mut model, "Algebra", 1);
        add_session(&mut model, "Biology", 1);

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(PersonConflicts::new(32.0)),
        ];
        let (solver, outcome) = solve(&model, modules);
        assert!(objective(outcome).abs() < 1e-6);
        let map = solver.scheduling_map();
        assert_ne!(map.values().collect::<Vec<_>>()[0], map.values().collect::<Vec<_>>()[1]);
    }

    #[test]
    fn test_unaligned_two_slot_session_penalized_at_odd_start() {
        let mut model = week(&["Monday"], 4);
        let session = add_session(&mut model, "Algebra", 2);
        model
            .whitelist_time(session, (None, Some(SlotId(1))))
            .unwrap();

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(TimeWhitelist),
            Box::new(UnalignedAllocation::new(16.0)),
        ];
        let (_, outcome) = solve(&model, modules);
        assert!((objective(outcome) - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_aligned_start_is_free() {
        let mut model = week(&["Monday"], 4);
        add_session(&mut model, "Algebra", 2);

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(UnalignedAllocation::new(16.0)),
        ];
        let (solver, outcome) = solve(&model, modules);
        assert!(objective(outcome).abs() < 1e-6);
        let (_, slot) = solver.scheduling_map()[&crate::models::SessionId(0)];
        assert_eq!(slot.0 % 2, 0);
    }

    #[test]
    fn test_undesired_times_accumulate_per_cell() {
        let mut model = week(&["Monday", "Friday"], 2);
        let friday = model.find_day("Friday").unwrap();
        let module = UndesiredTimes::new(
            &model,
            &[
                (None, Some(SlotId(0)), 2.0),
                (Some(friday), None, 1.0),
                (Some(friday), Some(SlotId(0)), 4.0),
            ],
        );

        assert_eq!(module.penalties[&(DayId(0), SlotId(0))], 2.0);
        assert_eq!(module.penalties[&(friday, SlotId(0))], 7.0);
        assert_eq!(module.penalties[&(friday, SlotId(1))], 1.0);
        assert!(!module.penalties.contains_key(&(DayId(0), SlotId(1))));
    }

    #[test]
    fn test_undesired_time_scales_with_participant_weights() {
        let mut model = week(&["Monday"], 2);
        let session = add_session(&mut model, "Algebra", 1);
        let second = model.find_add_person("Other");
        model.add_student(session, second);
        model.set_person_weight(second, 1.5);
        model
            .whitelist_time(session, (None, Some(SlotId(0))))
            .unwrap();

        let undesired = UndesiredTimes::new(&model, &[(None, Some(SlotId(0)), 2.0)]);
        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(TimeWhitelist),
            Box::new(undesired),
        ];
        let (_, outcome) = solve(&model, modules);
        // 2.0 penalty x (1.0 + 1.5) participant weight
        assert!((objective(outcome) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_lunch_denial_only_when_every_lunch_slot_is_busy() {
        // Lunch covers slots 0 and 1. Two sessions pinned over both slots
        // leave no lunch break; the denial fires.
        let mut model = week(&["Monday"], 3);
        let a = add_session(&mut model, "Algebra", 1);
        let b = add_session(&mut model, "Biology", 1);
        model.whitelist_time(a, (None, Some(SlotId(0)))).unwrap();
        model.whitelist_time(b, (None, Some(SlotId(1)))).unwrap();

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(TimeWhitelist),
            Box::new(NoLunchBreaks::new(vec![SlotId(0), SlotId(1)], 2.0)),
        ];
        let (_, outcome) = solve(&model, modules);
        assert!((objective(outcome) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_partially_busy_lunch_is_free() {
        let mut model = week(&["Monday"], 3);
        let a = add_session(&mut model, "Algebra", 1);
        model.whitelist_time(a, (None, Some(SlotId(0)))).unwrap();

        let modules: Vec<Box<dyn Constraint>> = vec![
            Box::new(SessionsScheduled),
            Box::new(TimeWhitelist),
            Box::new(NoLunchBreaks::new(vec![SlotId(0), SlotId(1)], 2.0)),
        ];
        let (_, outcome) = solve(&model, modules);
        assert!(objective(outcome).abs() < 1e-6);
    }
}
