//! Week-problem configuration.

use serde::{Deserialize, Serialize};

/// A penalized (day, slot) pattern. `None` widens the axis to every day
/// or every slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndesiredTime {
    pub day: Option<String>,
    pub start_hour: Option<u32>,
    pub penalty: f64,
}

impl UndesiredTime {
    pub fn new(day: Option<&str>, start_hour: Option<u32>, penalty: f64) -> Self {
        Self {
            day: day.map(str::to_string),
            start_hour,
            penalty,
        }
    }
}

/// Everything the weekly scheduler needs to shape a week and weigh its
/// preferences.
///
/// # Examples
///
/// ```
/// use timetabler::scheduler::ScheduleOptions;
///
/// let options = ScheduleOptions::default().with_weeks(35, 40);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// First week to schedule (inclusive).
    pub first_week: u32,
    /// Last week to schedule (inclusive).
    pub last_week: u32,
    /// Teaching days, in week order.
    pub day_names: Vec<String>,
    /// One-hour slots per day.
    pub slots_per_day: usize,
    /// Hour at which the first slot begins.
    pub start_hour: u32,
    /// Rooms requiring exclusive booking.
    pub rooms: Vec<String>,

    /// Penalty per simultaneous-session overlap per person.
    pub person_conflict_penalty: f64,
    /// Penalty mass for bunched sessions of one course.
    pub course_spreading_penalty: f64,
    /// Penalty for multi-slot sessions off the alignment grid.
    pub unaligned_penalty: f64,
    /// Bonus for matching a person's prior-week timing.
    pub stability_bonus: f64,
    /// Penalty per person per day without any free lunch slot.
    pub lunch_denial_penalty: f64,
    /// Start hours of the slots counting as lunch.
    pub lunch_start_hours: Vec<u32>,
    /// Penalized time patterns.
    pub undesired_times: Vec<UndesiredTime>,

    /// Abort a solve after this many seconds without improvement.
    pub stagnation_timeout_secs: u64,
    /// Seconds between optimality-gap reports.
    pub gap_report_interval_secs: u64,
    /// Re-export the timetable on every incumbent found during solving.
    pub export_intermediate: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            first_week: 0,
            last_week: 53,
            day_names: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
                .map(String::from)
                .to_vec(),
            slots_per_day: 10,
            start_hour: 8,
            rooms: Vec::new(),
            person_conflict_penalty: 32.0,
            course_spreading_penalty: 4.0,
            unaligned_penalty: 16.0,
            stability_bonus: 1.0,
            lunch_denial_penalty: 2.0,
            lunch_start_hours: vec![11, 12, 13],
            undesired_times: vec![
                UndesiredTime::new(None, Some(8), 2.0),
                UndesiredTime::new(None, Some(16), 1.0),
                UndesiredTime::new(None, Some(17), 2.0),
                UndesiredTime::new(Some("Friday"), Some(14), 1.0),
                UndesiredTime::new(Some("Friday"), Some(15), 1.0),
                UndesiredTime::new(Some("Friday"), Some(16), 2.0),
                UndesiredTime::new(Some("Friday"), Some(17), 2.0),
                UndesiredTime::new(Some("Saturday"), None, 8.0),
            ],
            stagnation_timeout_secs: 300,
            gap_report_interval_secs: 5,
            export_intermediate: false,
        }
    }
}

impl ScheduleOptions {
    pub fn with_weeks(mut self, first: u32, last: u32) -> Self {
        self.first_week = first;
        self.last_week = last;
        self
    }

    pub fn with_days<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.day_names = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    pub fn with_slots(mut self, slots_per_day: usize, start_hour: u32) -> Self {
        self.slots_per_day = slots_per_day;
        self.start_hour = start_hour;
        self
    }

    pub fn with_rooms<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.rooms = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.day_names.is_empty() {
            return Err("at least one teaching day is required".into());
        }
        if self.slots_per_day == 0 {
            return Err("slots_per_day must be positive".into());
        }
        if self.last_week < self.first_week {
            return Err(format!(
                "last_week {} precedes first_week {}",
                self.last_week, self.first_week
            ));
        }
        for hour in &self.lunch_start_hours {
            if *hour < self.start_hour
                || *hour >= self.start_hour + self.slots_per_day as u32
            {
                return Err(format!("lunch hour {hour} is outside the teaching day"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(ScheduleOptions::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_week_shape() {
        let options = ScheduleOptions::default().with_days(Vec::<&str>::new());
        assert!(options.validate().is_err());

        let options = ScheduleOptions::default().with_slots(0, 8);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_week_range() {
        let options = ScheduleOptions::default().with_weeks(10, 5);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_lunch_outside_day() {
        let mut options = ScheduleOptions::default().with_slots(2, 8);
        options.lunch_start_hours = vec![11];
        assert!(options.validate().is_err());
    }
}
