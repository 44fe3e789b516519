//! MIP model builder and solver.
//!
//! `MipSolver` owns the decision-variable scheme and buffers everything the
//! constraint modules contribute (variables, named linear constraints,
//! weighted objective terms) in engine-agnostic form. `solve` translates
//! the buffered model into `good_lp` once, runs the engine, and keeps the
//! solution values for read-back. One solver instance covers exactly one
//! week: it is created for a model, solved once, and dropped.
//!
//! # Decision-variable scheme
//!
//! For every (day, session, slot) where the session fits when started at
//! that slot, one binary start variable is allocated. No variables exist
//! for starts that would run past the end of the day, so "the session is
//! somewhere valid" is expressible as a plain sum over start variables.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution as _, SolverModel, Variable, VariableDefinition,
};
use log::{debug, warn};

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::export::TimetableView;
use crate::models::{DayId, Model, SessionId, SlotId};
use crate::solver::callbacks::{AbortHandle, ProgressInfo, ProgressObserver, SolvePhase};
use crate::solver::config::SolveConfig;
use crate::solver::expr::{LinExpr, VarId};
use crate::solver::stats::{BuildStats, TextTable};

/// Objective results with absolute value below this are treated as zero;
/// the engine returns near-integral floating values.
const DOUBLE_ZERO_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
enum Sense {
    Eq,
    Le,
}

struct StoredConstraint {
    name: String,
    lhs: LinExpr,
    sense: Sense,
    rhs: LinExpr,
}

struct ObjectiveTerm {
    weight: f64,
    var: VarId,
    name: String,
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// An optimal schedule was found.
    Solved {
        /// Final objective value (penalties minus bonuses).
        objective: f64,
        /// Sum of positive objective contributions.
        penalty_total: f64,
        /// Sum of negative objective contributions, as a positive number.
        bonus_total: f64,
        /// Engine wall-clock time.
        solve_time: Duration,
    },
    /// The hard constraint set admits no schedule.
    Infeasible,
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved { .. })
    }
}

/// Engine-backed model builder for one week.
pub struct MipSolver {
    label: String,
    day_count: usize,
    slot_count: usize,
    session_lengths: Vec<usize>,
    vars: Option<ProblemVariables>,
    handles: Vec<Variable>,
    start_vars: Vec<Vec<Vec<VarId>>>, // [day][session][start position]
    constraints: Vec<StoredConstraint>,
    constraint_terms: usize,
    objectives: Vec<ObjectiveTerm>,
    stats: BuildStats,
    values: Option<Vec<f64>>,
}

impl MipSolver {
    /// Creates a solver for the model and allocates its assignment
    /// variables.
    pub fn new(model: &Model) -> Self {
        let mut solver = Self {
            label: model.model_name.clone(),
            day_count: model.day_count(),
            slot_count: model.slot_count(),
            session_lengths: model
                .session_ids()
                .map(|s| model.session(s).length)
                .collect(),
            vars: Some(ProblemVariables::new()),
            handles: Vec::new(),
            start_vars: Vec::new(),
            constraints: Vec::new(),
            constraint_terms: 0,
            objectives: Vec::new(),
            stats: BuildStats::new(),
            values: None,
        };

        solver.start_vars = vec![vec![Vec::new(); solver.session_lengths.len()]; solver.day_count];
        for session in model.session_ids() {
            let label = model.session_label(session);
            for day in model.day_ids() {
                for slot in model.slots_for(session) {
                    let name = format!(
                        "ASSIGN-{}-{}-{}",
                        model.day(day).name,
                        model.slot(slot).label(),
                        label
                    );
                    let var = solver.add_var(variable().binary(), name);
                    solver.start_vars[day.0][session.0].push(var);
                }
            }
        }
        solver.stats.set_assignment_variables(solver.handles.len());
        solver
    }

    /// Build statistics accumulated so far.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    // --- capability surface for constraint modules ---

    /// Adds a binary variable.
    pub fn add_binary_var(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(variable().binary(), name.into())
    }

    /// Adds an integer variable; `max` of `None` means unbounded above.
    pub fn add_integer_var(&mut self, min: f64, max: Option<f64>, name: impl Into<String>) -> VarId {
        let mut def = variable().integer().min(min);
        if let Some(max) = max {
            def = def.max(max);
        }
        self.add_var(def, name.into())
    }

    /// Adds a continuous variable; `max` of `None` means unbounded above.
    pub fn add_linear_var(&mut self, min: f64, max: Option<f64>, name: impl Into<String>) -> VarId {
        let mut def = variable().min(min);
        if let Some(max) = max {
            def = def.max(max);
        }
        self.add_var(def, name.into())
    }

    fn add_var(&mut self, def: VariableDefinition, name: String) -> VarId {
        let vars = self
            .vars
            .as_mut()
            .expect("variables cannot be added once the model has been solved");
        let handle = vars.add(def.name(name));
        let id = VarId(self.handles.len());
        self.handles.push(handle);
        id
    }

    /// Adds `lhs == rhs`.
    pub fn add_equals_constr(
        &mut self,
        lhs: LinExpr,
        rhs: impl Into<LinExpr>,
        name: impl Into<String>,
    ) {
        self.push_constr(lhs, Sense::Eq, rhs.into(), name.into());
    }

    /// Adds `lhs <= rhs`.
    pub fn add_less_equals_constr(
        &mut self,
        lhs: LinExpr,
        rhs: impl Into<LinExpr>,
        name: impl Into<String>,
    ) {
        self.push_constr(lhs, Sense::Le, rhs.into(), name.into());
    }

    fn push_constr(&mut self, lhs: LinExpr, sense: Sense, rhs: LinExpr, name: String) {
        self.constraint_terms += lhs.term_count() + rhs.term_count();
        self.constraints.push(StoredConstraint {
            name,
            lhs,
            sense,
            rhs,
        });
    }

    /// Adds `weight * var` to the global minimization objective. Bonuses
    /// use negative weights.
    pub fn add_objective(&mut self, weight: f64, var: VarId, name: impl Into<String>) {
        self.objectives.push(ObjectiveTerm {
            weight,
            var,
            name: name.into(),
        });
    }

    /// The start variable for `session` beginning at `slot` on `day`.
    ///
    /// # Panics
    ///
    /// Panics if the session does not fit when started at `slot`; callers
    /// restrict themselves to `Model::slots_for`.
    pub fn start_var(&self, day: DayId, slot: SlotId, session: SessionId) -> VarId {
        assert!(
            self.fits(session, slot),
            "session {} does not fit when started at slot {}",
            session.0,
            slot.0
        );
        self.start_vars[day.0][session.0][slot.0]
    }

    /// Every start variable whose occupied range covers the given
    /// coordinates. `None` widens that axis: all days, all slots, or all
    /// sessions (cross product).
    pub fn assign_vars(
        &self,
        day: Option<DayId>,
        slot: Option<SlotId>,
        session: Option<SessionId>,
    ) -> Vec<VarId> {
        let days: Vec<usize> = match day {
            Some(d) => vec![d.0],
            None => (0..self.day_count).collect(),
        };
        let sessions: Vec<usize> = match session {
            Some(s) => vec![s.0],
            None => (0..self.session_lengths.len()).collect(),
        };

        let mut vars = Vec::new();
        for &d in &days {
            for &s in &sessions {
                let length = self.session_lengths[s];
                if length > self.slot_count {
                    continue;
                }
                let mut first = 0usize;
                let mut last = self.slot_count - length;
                if let Some(k) = slot {
                    first = first.max(k.0.saturating_sub(length - 1));
                    last = last.min(k.0);
                }
                if first > last {
                    continue;
                }
                for position in first..=last {
                    vars.push(self.start_vars[d][s][position]);
                }
            }
        }
        vars
    }

    /// Value of a variable in the solution, rounded to the nearest integer
    /// (the engine may return near-integral floating values).
    ///
    /// # Panics
    ///
    /// Panics if no solution is available yet.
    pub fn var_value(&self, var: VarId) -> i64 {
        self.raw_value(var).round() as i64
    }

    fn raw_value(&self, var: VarId) -> f64 {
        self.values
            .as_ref()
            .expect("no solution available; call solve first")[var.index()]
    }

    /// Whether the session starts exactly at (day, slot).
    pub fn is_scheduled_at(&self, day: DayId, slot: SlotId, session: SessionId) -> bool {
        self.var_value(self.start_var(day, slot, session)) == 1
    }

    /// Extracts the session → (day, start slot) assignment.
    pub fn scheduling_map(&self) -> BTreeMap<SessionId, (DayId, SlotId)> {
        let mut map = BTreeMap::new();
        for s in 0..self.session_lengths.len() {
            for d in 0..self.day_count {
                for (position, &var) in self.start_vars[d][s].iter().enumerate() {
                    if self.var_value(var) == 1 {
                        map.insert(SessionId(s), (DayId(d), SlotId(position)));
                    }
                }
            }
        }
        map
    }

    /// Diagnostic names of every constraint added so far, in insertion
    /// order.
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|c| c.name.as_str())
    }

    fn fits(&self, session: SessionId, slot: SlotId) -> bool {
        slot.0 + self.session_lengths[session.0] <= self.slot_count
    }

    // --- solving ---

    /// Runs the module phases, assembles the engine model and solves it.
    ///
    /// All modules' `add_variables` hooks run before any `add_constraints`
    /// hook, and all of those before any `add_objectives` hook, because a
    /// later phase may reference variables any module created. A hook
    /// failure aborts the solve. Observers are invoked synchronously on
    /// engine progress events.
    pub fn solve(
        &mut self,
        model: &Model,
        modules: &mut [Box<dyn Constraint + '_>],
        observers: &mut [Box<dyn ProgressObserver + '_>],
        config: &SolveConfig,
    ) -> Result<SolveOutcome> {
        if self.values.is_some() || self.vars.is_none() {
            return Err(Error::Engine(
                "this solver has already solved its model; create a new solver per week".into(),
            ));
        }
        model.assert_valid()?;

        for module in modules.iter_mut() {
            let vars_before = self.handles.len();
            module.add_variables(self, model)?;
            self.stats.module(module.name()).variables += self.handles.len() - vars_before;
        }
        for module in modules.iter_mut() {
            let constrs_before = self.constraints.len();
            let terms_before = self.constraint_terms;
            module.add_constraints(self, model)?;
            let counts = self.stats.module(module.name());
            counts.constraints += self.constraints.len() - constrs_before;
            counts.constraint_terms += self.constraint_terms - terms_before;
        }
        for module in modules.iter_mut() {
            let objectives_before = self.objectives.len();
            module.add_objectives(self, model)?;
            self.stats.module(module.name()).objective_terms +=
                self.objectives.len() - objectives_before;
        }

        if config.print_reports {
            let title = format!("{} ({} sessions)", self.label, self.session_lengths.len());
            println!("{}", self.stats.render_table(&title));
        }
        if let Some(threads) = config.threads {
            debug!("requested {threads} engine worker threads");
        }

        let abort = AbortHandle::new();
        let started = Instant::now();
        let search_info = ProgressInfo {
            elapsed: Duration::ZERO,
            best_objective: None,
            best_bound: None,
            phase: SolvePhase::Search,
        };
        for observer in observers.iter_mut() {
            observer.on_progress(&search_info, &abort);
        }

        let Some(vars) = self.vars.take() else {
            return Err(Error::Engine("solver variables already consumed".into()));
        };
        let mut objective = Expression::from(0.0);
        for term in &self.objectives {
            objective += term.weight * self.handles[term.var.index()];
        }
        let mut engine = vars.minimise(objective).using(default_solver);
        for stored in &self.constraints {
            let lhs = to_expression(&self.handles, &stored.lhs);
            let rhs = to_expression(&self.handles, &stored.rhs);
            match stored.sense {
                Sense::Eq => {
                    engine.add_constraint(constraint!(lhs == rhs));
                }
                Sense::Le => {
                    engine.add_constraint(constraint!(lhs <= rhs));
                }
            }
        }

        debug!(
            "solving {} ({} variables, {} constraints)",
            self.label,
            self.handles.len(),
            self.constraints.len()
        );
        let solved = engine.solve();
        let elapsed = started.elapsed();

        match solved {
            Ok(solution) => {
                self.values = Some(self.handles.iter().map(|h| solution.value(*h)).collect());

                let mut penalty_total = 0.0;
                let mut bonus_total = 0.0;
                let mut objective_value = 0.0;
                for term in &self.objectives {
                    let result = term.weight * self.raw_value(term.var);
                    objective_value += result;
                    if result >= DOUBLE_ZERO_THRESHOLD {
                        penalty_total += result;
                        if config.print_reports {
                            println!("Penalty: {}. Cost: {:.2}", term.name, result);
                        }
                    } else if result <= -DOUBLE_ZERO_THRESHOLD {
                        bonus_total += -result;
                    }
                }

                if config.print_reports {
                    let mut table = TextTable::new(5);
                    table.row([
                        "Problem".into(),
                        "Solve time".into(),
                        "Stability bonus".into(),
                        "Penalties".into(),
                        "Total quality".into(),
                    ]);
                    table.delimiter();
                    table.row([
                        self.label.clone(),
                        time_string(elapsed),
                        format!("{bonus_total:.2}"),
                        format!("{:.2}", -penalty_total),
                        format!("{:.2}", -objective_value),
                    ]);
                    println!("{}", table.render());
                }

                let info = ProgressInfo {
                    elapsed,
                    best_objective: Some(objective_value),
                    best_bound: Some(objective_value),
                    phase: SolvePhase::Incumbent,
                };
                for observer in observers.iter_mut() {
                    observer.on_progress(&info, &abort);
                    observer.on_incumbent(&info, model, &*self, &abort);
                }
                let finished = ProgressInfo {
                    phase: SolvePhase::Finished,
                    ..info
                };
                for observer in observers.iter_mut() {
                    observer.on_progress(&finished, &abort);
                }

                Ok(SolveOutcome::Solved {
                    objective: objective_value,
                    penalty_total,
                    bonus_total,
                    solve_time: elapsed,
                })
            }
            Err(ResolutionError::Infeasible) => {
                warn!(
                    "{} is infeasible ({} constraints over {} variables)",
                    self.label,
                    self.constraints.len(),
                    self.handles.len()
                );
                if config.print_reports {
                    println!(
                        "Problem is unsolvable: the hard constraints conflict. \
                         See the statistics table above for the per-module constraint sets."
                    );
                }
                let finished = ProgressInfo {
                    elapsed,
                    best_objective: None,
                    best_bound: None,
                    phase: SolvePhase::Finished,
                };
                for observer in observers.iter_mut() {
                    observer.on_progress(&finished, &abort);
                }
                Ok(SolveOutcome::Infeasible)
            }
            Err(other) => Err(Error::Engine(other.to_string())),
        }
    }
}

impl TimetableView for MipSolver {
    fn is_scheduled_during(&self, day: DayId, slot: SlotId, session: SessionId) -> bool {
        if self.values.is_none() {
            return false;
        }
        self.assign_vars(Some(day), Some(slot), Some(session))
            .iter()
            .any(|&var| self.var_value(var) == 1)
    }
}

fn to_expression(handles: &[Variable], lin: &LinExpr) -> Expression {
    let mut expr = Expression::from(lin.constant());
    for &(coeff, var) in lin.terms() {
        expr += coeff * handles[var.index()];
    }
    expr
}

fn time_string(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn grid_model(days: usize, slots: usize, session_lengths: &[usize]) -> Model {
        let mut model = Model::new(0, 8);
        for i in 0..days {
            model.add_day(format!("Day{i}"));
        }
        model.add_slots(slots);
        let course = model.add_course("Course");
        let alice = model.add_person("Alice");
        for &length in session_lengths {
            let session = model.add_session(
                course,
                None,
                None,
                BTreeSet::from(["G".to_string()]),
                length,
                None,
                0,
            );
            model.add_student(session, alice);
        }
        model
    }

    #[test]
    fn test_start_vars_only_for_fitting_starts() {
        let model = grid_model(2, 4, &[2]);
        let solver = MipSolver::new(&model);
        // 2 days x (4 - 2 + 1) fitting starts
        assert_eq!(solver.stats().assignment_variables(), 6);
    }

    #[test]
    fn test_assign_vars_coverage_counts() {
        let model = grid_model(2, 4, &[2]);
        let solver = MipSolver::new(&model);
        let session = SessionId(0);
        let day = DayId(0);

        // Slot 0 is covered only by a start at 0.
        assert_eq!(solver.assign_vars(Some(day), Some(SlotId(0)), Some(session)).len(), 1);
        // Slot 1 is covered by starts at 0 and 1.
        assert_eq!(solver.assign_vars(Some(day), Some(SlotId(1)), Some(session)).len(), 2);
        // Slot 3 is covered only by a start at 2 (start 3 would not fit).
        assert_eq!(solver.assign_vars(Some(day), Some(SlotId(3)), Some(session)).len(), 1);
        // Widening: all fitting starts on one day, then on both days.
        assert_eq!(solver.assign_vars(Some(day), None, Some(session)).len(), 3);
        assert_eq!(solver.assign_vars(None, None, Some(session)).len(), 6);
    }

    #[test]
    fn test_assign_vars_empty_for_unschedulable_session() {
        let model = grid_model(1, 2, &[3]);
        let solver = MipSolver::new(&model);
        assert!(solver
            .assign_vars(None, None, Some(SessionId(0)))
            .is_empty());
        assert_eq!(solver.stats().assignment_variables(), 0);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_start_var_rejects_unfitting_start() {
        let model = grid_model(1, 4, &[2]);
        let solver = MipSolver::new(&model);
        solver.start_var(DayId(0), SlotId(3), SessionId(0));
    }

    #[test]
    fn test_solve_assigns_exactly_one_start() {
        let model = grid_model(1, 2, &[1]);
        let mut solver = MipSolver::new(&model);
        let mut once = LinExpr::new();
        for var in solver.assign_vars(None, None, Some(SessionId(0))) {
            once.add_term(1.0, var);
        }
        solver.add_equals_constr(once, 1.0, "SCHEDULED");

        let config = SolveConfig::default().quiet();
        let outcome = solver.solve(&model, &mut [], &mut [], &config).unwrap();
        assert!(outcome.is_solved());

        let assigned: i64 = solver
            .assign_vars(None, None, Some(SessionId(0)))
            .iter()
            .map(|&v| solver.var_value(v))
            .sum();
        assert_eq!(assigned, 1);
        assert_eq!(solver.scheduling_map().len(), 1);
    }

    #[test]
    fn test_objective_steers_start_choice() {
        let model = grid_model(1, 2, &[1]);
        let mut solver = MipSolver::new(&model);
        let session = SessionId(0);
        let mut once = LinExpr::new();
        for var in solver.assign_vars(None, None, Some(session)) {
            once.add_term(1.0, var);
        }
        solver.add_equals_constr(once, 1.0, "SCHEDULED");
        solver.add_objective(5.0, solver.start_var(DayId(0), SlotId(0), session), "AVOID-0");

        let config = SolveConfig::default().quiet();
        let outcome = solver.solve(&model, &mut [], &mut [], &config).unwrap();
        match outcome {
            SolveOutcome::Solved { objective, .. } => assert!(objective.abs() < 1e-6),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(solver.is_scheduled_at(DayId(0), SlotId(1), session));
        assert!(!solver.is_scheduled_at(DayId(0), SlotId(0), session));
    }

    #[test]
    fn test_conflicting_constraints_report_infeasible() {
        let model = grid_model(1, 2, &[1]);
        let mut solver = MipSolver::new(&model);
        let vars = solver.assign_vars(None, None, Some(SessionId(0)));
        let mut lhs = LinExpr::new();
        for var in &vars {
            lhs.add_term(1.0, *var);
        }
        solver.add_equals_constr(lhs.clone(), 1.0, "SCHEDULED");
        solver.add_equals_constr(lhs, 0.0, "FORBIDDEN");

        let config = SolveConfig::default().quiet();
        let outcome = solver.solve(&model, &mut [], &mut [], &config).unwrap();
        assert_eq!(outcome, SolveOutcome::Infeasible);
        let names: Vec<&str> = solver.constraint_names().collect();
        assert_eq!(names, vec!["SCHEDULED", "FORBIDDEN"]);
    }

    #[test]
    fn test_solver_cannot_be_reused() {
        let model = grid_model(1, 2, &[1]);
        let mut solver = MipSolver::new(&model);
        let config = SolveConfig::default().quiet();
        solver.solve(&model, &mut [], &mut [], &config).unwrap();
        let err = solver.solve(&model, &mut [], &mut [], &config).unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn test_time_string_formats() {
        assert_eq!(time_string(Duration::from_secs(42)), "42s");
        assert_eq!(time_string(Duration::from_secs(125)), "2m 5s");
        assert_eq!(time_string(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
