//! Multi-week orchestration.
//!
//! One model build and solve per week, strictly sequential: every accepted
//! week feeds the stability bonus of the weeks after it.

mod options;
mod weekly;

pub use options::{ScheduleOptions, UndesiredTime};
pub use weekly::WeeklyScheduler;
