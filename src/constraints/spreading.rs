//! Course spreading.
//!
//! A person's sessions for one course should be spread across the week
//! rather than bunched on the same or adjacent days.

use std::collections::BTreeMap;

use crate::constraints::Constraint;
use crate::error::Result;
use crate::models::{Model, SessionId};
use crate::solver::{LinExpr, MipSolver, VarId};

/// Break calculations assume a week of this many teaching days.
const DESIRED_WEEK_LENGTH: usize = 5;

/// It makes little sense to ask for more than 2 days of break on a 7-day
/// week: a weekend break is only 2 days anyway.
const MAX_BREAK_LENGTH: usize = 2;

/// Penalizes scheduling a person's sessions of one course too close
/// together.
///
/// Only courses where a person attends between 2 and 5 sessions are
/// considered. The target break between two sessions is
/// `(5 - count) / (count - 1)` days, capped at 2. The per-person penalty
/// mass is distributed linearly over the day offsets within that break,
/// offset 0 taking the largest share, and accumulated over all persons
/// into a map keyed by (session, session, day offset).
///
/// The linearization works by penalty accumulation rather than a classic
/// big-M indicator: for each (anchor session, day), a trigger expression
/// sums every applicable penalty against both the anchor's start variables
/// on that day and the paired session's start variables on the offset day.
/// The trigger is bounded by the anchor's total mapped penalty plus a
/// continuous absorber variable, so the absorber takes exactly the excess
/// that appears once both sides of a close pairing are active. The trigger
/// can never exceed twice the total, which keeps the bound tight without
/// any artificial constant.
pub struct NoCourseSpreading {
    max_penalty: f64,
    absorbers: Vec<VarId>,
}

impl NoCourseSpreading {
    pub fn new(max_penalty: f64) -> Self {
        Self {
            max_penalty,
            absorbers: Vec::new(),
        }
    }

    /// Accumulated penalty per (session, session, day offset) over every
    /// person's student sessions of every course.
    fn penalty_map(&self, model: &Model) -> BTreeMap<(SessionId, SessionId, i64), f64> {
        let mut map: BTreeMap<(SessionId, SessionId, i64), f64> = BTreeMap::new();

        for person in model.person_ids() {
            for sessions in model.student_sessions_by_course(person) {
                let count = sessions.len();
                if count <= 1 || count > DESIRED_WEEK_LENGTH {
                    continue;
                }

                // For a standard 5-day week this gives:
                // 2 sessions -> 1 break of 2 days, 3 sessions -> 2 breaks
                // of 1 day, 4 or 5 sessions -> breaks of 0 days. Zero-day
                // breaks still matter: several sessions on the same day
                // stay penalized.
                let break_days = DESIRED_WEEK_LENGTH - count;
                let breaks = count - 1;
                let break_length = (break_days / breaks).min(MAX_BREAK_LENGTH);

                // +1 so the day a session is scheduled on is included.
                let penalty_per_day =
                    model.person(person).weight * self.max_penalty / (break_length + 1) as f64;

                for i in 0..count - 1 {
                    for j in (i + 1)..count {
                        for offset in 0..=break_length {
                            let share = penalty_per_day * ((break_length + 1) - offset) as f64;
                            *map.entry((sessions[i], sessions[j], offset as i64))
                                .or_insert(0.0) += share;
                        }
                    }
                }
            }
        }
        map
    }
}

impl Constraint for NoCourseSpreading {
    fn name(&self) -> &'static str {
        "NoCourseSpreading"
    }

    fn add_variables(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        self.absorbers = model
            .session_ids()
            .map(|session| {
                solver.add_linear_var(
                    0.0,
                    None,
                    format!("{}-{}", self.name(), model.session_label(session)),
                )
            })
            .collect();
        Ok(())
    }

    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        let map = self.penalty_map(model);

        for day in model.day_ids() {
            for session in model.session_ids() {
                let mut trigger = LinExpr::new();
                let mut total_penalty = 0.0;

                for other in model.session_ids() {
                    for other_day in model.day_ids() {
                        let offset = other_day.0 as i64 - day.0 as i64;
                        let Some(&penalty) = map.get(&(session, other, offset)) else {
                            continue;
                        };
                        total_penalty += penalty;

                        for var in solver.assign_vars(Some(day), None, Some(session)) {
                            trigger.add_term(penalty, var);
                        }
                        for var in solver.assign_vars(Some(other_day), None, Some(other)) {
                            trigger.add_term(penalty, var);
                        }
                    }
                }

                if total_penalty > 0.0 {
                    let mut limit = LinExpr::from(total_penalty);
                    limit.add_term(1.0, self.absorbers[session.0]);
                    solver.add_less_equals_constr(
                        trigger,
                        limit,
                        format!(
                            "{}-{}-{}",
                            self.name(),
                            model.session_label(session),
                            model.day(day).name
                        ),
                    );
                }
            }
        }
        Ok(())
    }

    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        // Person weights are already folded into the absorber bounds.
        for session in model.session_ids() {
            solver.add_objective(
                1.0,
                self.absorbers[session.0],
                format!("{}-{}", self.name(), model.session_label(session)),
            );
        }
        Ok(())
    }
}
