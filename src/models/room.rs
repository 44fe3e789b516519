//! Bookable rooms.
//!
//! Only sessions that need exclusive use of a specific room carry a room
//! reference; everything else is scheduled without one.

use serde::{Deserialize, Serialize};

/// Index of a room within its week model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub usize);

/// A room requiring exclusive use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Display name, e.g. "Lab 3".
    pub name: String,
}

impl Room {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
