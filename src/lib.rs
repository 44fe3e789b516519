//! University course timetabling via mixed-integer programming.
//!
//! Translates a weekly timetabling problem of courses, sessions, rooms,
//! students and staff into a binary start-variable model, lets a set of
//! independent constraint modules contribute variables, linear constraints
//! and weighted objective terms, solves one week at a time, and feeds each
//! accepted schedule into the next week's stability bonus.
//!
//! # Modules
//!
//! - **`models`**: domain types (`Model`, `Session`, `Person`, `Solution`)
//! - **`solver`**: the capability surface modules build against: decision
//!   variables, linear expressions, build statistics, progress callbacks
//! - **`constraints`**: the hard/soft constraint module set
//! - **`import`** / **`export`**: JSON problem input, HTML timetable output
//! - **`scheduler`**: the week-by-week orchestration loop
//!
//! The MIP engine is `good_lp` over the pure-Rust `microlp` backend;
//! nothing outside `solver` touches engine types.

pub mod constraints;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod scheduler;
pub mod solver;

pub use error::{Error, Result};
