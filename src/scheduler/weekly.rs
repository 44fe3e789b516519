//! The week-by-week scheduling loop.

use std::time::Duration;

use log::{debug, info, warn};

use crate::constraints::{
    Constraint, NoCourseSpreading, NoLunchBreaks, NoRoomConflicts, NoStaffConflicts,
    PersonConflicts, RoomBreaks, SessionsScheduled, TimeBlacklist, TimeWhitelist,
    TimetableInstability, UnalignedAllocation, UndesiredTimes,
};
use crate::error::{Error, Result};
use crate::export::Exporter;
use crate::import::Importer;
use crate::models::{Model, Solution};
use crate::scheduler::options::ScheduleOptions;
use crate::solver::{
    GapLogger, IntermediateResultExporter, MipSolver, ProgressObserver, SolveConfig,
    SolveOutcome, StagnationFinisher,
};

/// Schedules every week in the configured range, one solve per week.
///
/// Each accepted solution is appended to the running history and fed into
/// the next week's stability bonus, so weeks are strictly sequential. An
/// infeasible week halts the whole sequence: the weeks after it are not
/// attempted.
pub struct WeeklyScheduler<'a> {
    importer: &'a dyn Importer,
    exporter: &'a mut dyn Exporter,
    options: ScheduleOptions,
}

impl<'a> WeeklyScheduler<'a> {
    pub fn new(importer: &'a dyn Importer, exporter: &'a mut dyn Exporter) -> Self {
        Self {
            importer,
            exporter,
            options: ScheduleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScheduleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Runs the full week sequence and returns the accepted solutions.
    pub fn run(&mut self) -> Result<Vec<Solution>> {
        self.options.validate().map_err(Error::Model)?;
        let mut history: Vec<Solution> = Vec::new();

        for week in self.options.first_week..=self.options.last_week {
            let mut model = Model::new(week, self.options.start_hour);
            model.add_days(&self.options.day_names);
            model.add_slots(self.options.slots_per_day);
            model.add_rooms(&self.options.rooms);

            let imported = self.importer.import_problem(&mut model)?;
            if model.session_count() == 0 {
                debug!("week {week}: nothing to schedule");
                continue;
            }
            info!("week {week}: imported {imported} sessions");

            let mut solver = MipSolver::new(&model);
            let mut modules = build_modules(&model, &self.options, &history)?;

            let mut observers: Vec<Box<dyn ProgressObserver + '_>> = vec![
                Box::new(StagnationFinisher::new(Duration::from_secs(
                    self.options.stagnation_timeout_secs,
                ))),
                Box::new(GapLogger::new(Duration::from_secs(
                    self.options.gap_report_interval_secs,
                ))),
            ];
            if self.options.export_intermediate {
                observers.push(Box::new(IntermediateResultExporter::new(
                    &mut *self.exporter,
                )));
            }

            let config = SolveConfig::default();
            let outcome = solver.solve(&model, &mut modules, &mut observers, &config)?;
            drop(observers);
            drop(modules);

            match outcome {
                SolveOutcome::Solved { .. } => {
                    let schedule = solver.scheduling_map();
                    self.exporter.export(&model, &solver, true)?;
                    history.push(Solution::new(model, schedule));
                }
                SolveOutcome::Infeasible => {
                    warn!("week {week} is infeasible; the remaining weeks are not attempted");
                    break;
                }
            }
        }

        Ok(history)
    }
}

/// The full constraint module set for one week, with all previously
/// accepted solutions feeding the stability bonus.
fn build_modules<'h>(
    model: &Model,
    options: &ScheduleOptions,
    history: &'h [Solution],
) -> Result<Vec<Box<dyn Constraint + 'h>>> {
    let mut undesired = Vec::new();
    for entry in &options.undesired_times {
        let day = match &entry.day {
            Some(name) => Some(model.find_day(name).ok_or_else(|| {
                Error::Model(format!("unknown day '{name}' in undesired times"))
            })?),
            None => None,
        };
        let slot = match entry.start_hour {
            Some(hour) => Some(model.find_slot(hour).ok_or_else(|| {
                Error::Model(format!("no undesired-time slot starts at hour {hour}"))
            })?),
            None => None,
        };
        undesired.push((day, slot, entry.penalty));
    }

    let mut lunch_slots = Vec::new();
    for hour in &options.lunch_start_hours {
        lunch_slots.push(model.find_slot(*hour).ok_or_else(|| {
            Error::Model(format!("no lunch slot starts at hour {hour}"))
        })?);
    }

    Ok(vec![
        Box::new(SessionsScheduled),
        Box::new(TimeWhitelist),
        Box::new(TimeBlacklist),
        Box::new(NoStaffConflicts),
        Box::new(NoRoomConflicts),
        Box::new(RoomBreaks),
        Box::new(PersonConflicts::new(options.person_conflict_penalty)),
        Box::new(NoCourseSpreading::new(options.course_spreading_penalty)),
        Box::new(UnalignedAllocation::new(options.unaligned_penalty)),
        Box::new(TimetableInstability::new(history, options.stability_bonus)),
        Box::new(NoLunchBreaks::new(lunch_slots, options.lunch_denial_penalty)),
        Box::new(UndesiredTimes::new(model, &undesired)),
    ])
}
