//! Timetabling domain model.
//!
//! Entities are arena-owned by the per-week [`Model`] and referenced through
//! typed index ids. Everything is append-only during problem construction
//! and read-only once solving begins.

mod calendar;
mod course;
mod model;
mod person;
mod room;
mod solution;

pub use calendar::{Day, DayId, Slot, SlotId};
pub use course::{Course, CourseId, Session, SessionId, TimeSpec};
pub use model::Model;
pub use person::{Person, PersonId};
pub use room::{Room, RoomId};
pub use solution::Solution;
