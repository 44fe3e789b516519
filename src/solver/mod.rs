//! Solver abstraction.
//!
//! The capability surface constraint modules are coded against: variable
//! creation, named linear constraints, objective accumulation, value
//! read-back, and the start/covering variable queries of the assignment
//! scheme. The concrete engine (`good_lp` over `microlp`) is an
//! implementation detail of [`MipSolver::solve`]; everything else in the
//! crate works with [`VarId`] and [`LinExpr`].

mod callbacks;
mod config;
mod expr;
mod mip;
mod stats;

pub use callbacks::{
    AbortHandle, GapLogger, IntermediateResultExporter, ProgressInfo, ProgressObserver,
    SolvePhase, StagnationFinisher,
};
pub use config::SolveConfig;
pub use expr::{LinExpr, VarId};
pub use mip::{MipSolver, SolveOutcome};
pub use stats::{BuildStats, ModuleCounts};
