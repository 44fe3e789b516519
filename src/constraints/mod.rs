//! Constraint modules.
//!
//! A constraint module is a self-contained unit that contributes decision
//! variables, linear constraints and weighted objective terms to the week's
//! model. Modules are independent: none may assume anything about the
//! others, and the solver invokes each phase across *all* modules before
//! moving to the next phase, so a later phase may safely reference
//! variables any module created.
//!
//! Hard modules emit only constraints and decide feasibility; soft modules
//! emit weighted objective terms and shape quality. Every per-unit penalty
//! or bonus is additionally scaled by the affected person's weight.

mod hard;
mod soft;
mod spreading;
mod stability;

pub use hard::{
    DayBlacklist, NoRoomConflicts, NoStaffConflicts, RoomBreaks, SessionsScheduled,
    TimeBlacklist, TimeWhitelist,
};
pub use soft::{NoLunchBreaks, PersonConflicts, UnalignedAllocation, UndesiredTimes};
pub use spreading::NoCourseSpreading;
pub use stability::TimetableInstability;

use crate::error::Result;
use crate::models::Model;
use crate::solver::MipSolver;

/// A constraint module with three optional build phases.
///
/// The default hook bodies do nothing; a module implements only the phases
/// it needs. `name` identifies the module in statistics and diagnostics.
pub trait Constraint {
    fn name(&self) -> &'static str;

    /// Phase 1: allocate helper decision variables.
    fn add_variables(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        let _ = (solver, model);
        Ok(())
    }

    /// Phase 2: emit linear constraints.
    fn add_constraints(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        let _ = (solver, model);
        Ok(())
    }

    /// Phase 3: emit weighted objective terms.
    fn add_objectives(&mut self, solver: &mut MipSolver, model: &Model) -> Result<()> {
        let _ = (solver, model);
        Ok(())
    }
}
