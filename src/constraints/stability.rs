//! Cross-week timetable stability.
//!
//! People keep a weekly rhythm: a course that met Monday at 10 should keep
//! meeting Monday at 10. This module rewards candidate starts that match
//! where a person's sessions of the same course landed in earlier weeks.

use crate::constraints::Constraint;
use crate::error::Result;
use crate::models::{DayId, Model, PersonId, SessionId, SlotId, Solution};
use crate::solver::MipSolver;

/// Weight of a prior-week match with a different session type. Kept below
/// a full match so lecture and exercise sessions do not swap places
/// between weeks.
const SESSION_TYPE_MISMATCH_FACTOR: f64 = 0.75;

/// Bonuses below this are dropped instead of emitted as objective terms.
const MINIMUM_ACCEPTED_BONUS: f64 = 0.01;

/// Rewards schedules that match a person's prior-week session timing for
/// the same course (a bonus, so a negative objective weight).
pub struct TimetableInstability<'a> {
    solutions: &'a [Solution],
    base_bonus: f64,
}

impl<'a> TimetableInstability<'a> {
    pub fn new(solutions: &'a [Solution], base_bonus: f64) -> Self {
        Self {
            solutions,
            base_bonus,
        }
    }

    /// Averaged match weight in [0, 1] for starting `session` at
    /// (day, slot), from this person's point of view.
    ///
    /// Every prior solution where the person attends the course counts
    /// toward the average; the ones where they had a session of the course
    /// at exactly this time contribute the best type-match weight found.
    fn bonus_factor(
        &self,
        model: &Model,
        session: SessionId,
        day: DayId,
        slot: SlotId,
        person: PersonId,
    ) -> f64 {
        let person_name = &model.person(person).name;
        let course_name = &model.course(model.session(session).course).name;
        let day_name = &model.day(day).name;
        let start_hour = model.slot(slot).start_hour;
        let session_type = model.session(session).session_type.as_deref();

        let mut attended_count = 0;
        let mut total_weight = 0.0;

        for solution in self.solutions {
            if !solution.attends(person_name, course_name) {
                continue;
            }
            attended_count += 1;

            // Best match over whatever the person had at this time back
            // then (normally at most one session, with overlap penalized).
            let mut weight: f64 = 0.0;
            for prior_type in
                solution.session_types_scheduled(person_name, course_name, day_name, start_hour)
            {
                weight = weight.max(if prior_type == session_type {
                    1.0
                } else {
                    SESSION_TYPE_MISMATCH_FACTOR
                });
            }
            total_weight += weight;
        }

        if attended_count == 0 {
            0.0
        } else {
            total_weight / attended_count as f64
        }
    }
}

impl Constraint for TimetableInstability<'_> {
    fn name(&self) -> &'static str {
        "TimetableInstability"
    }

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        for session in model.session_ids() {
            for day in model.day_ids() {
                for slot in model.slots_for(session) {
                    let mut bonus = 0.0;
                    for person in model.session(session).persons() {
                        bonus += self.base_bonus
                            * model.person(person).weight
                            * self.bonus_factor(model, session, day, slot, person);
                    }

                    if bonus > MINIMUM_ACCEPTED_BONUS {
                        solver.add_objective(
                            -bonus,
                            solver.start_var(day, slot, session),
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
