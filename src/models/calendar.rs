//! Week grid: named days crossed with one-hour slots.
//!
//! A scheduling week is a fixed grid. Slots are totally ordered by their
//! position within the day and never span across days; a multi-slot session
//! occupies consecutive slots of a single day.

use serde::{Deserialize, Serialize};

/// Position of a day within the scheduling week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayId(pub usize);

/// Position of a slot within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub usize);

/// A named weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    /// Display name, e.g. "Monday".
    pub name: String,
}

impl Day {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A one-hour teaching slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Hour of day at which the slot begins.
    pub start_hour: u32,
    /// Hour of day at which the slot ends.
    pub end_hour: u32,
}

impl Slot {
    pub(crate) fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Zero-padded display label, e.g. "08-09".
    pub fn label(&self) -> String {
        format!("{:02}-{:02}", self.start_hour, self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_label_zero_pads() {
        assert_eq!(Slot::new(8, 9).label(), "08-09");
        assert_eq!(Slot::new(14, 15).label(), "14-15");
    }

    #[test]
    fn test_ids_order_by_position() {
        assert!(SlotId(2) < SlotId(3));
        assert!(DayId(0) < DayId(4));
    }
}
