//! Progress observation hooks.
//!
//! Observers are registered before a solve starts and invoked zero or more
//! times while the engine runs, synchronously on the solving thread. They
//! get a read-only progress snapshot and an abort capability, nothing
//! else. They must not block for long and cannot mutate model structure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::export::{Exporter, TimetableView};
use crate::models::Model;

/// Where the engine currently is in its search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePhase {
    /// The model is being assembled; no search yet.
    Build,
    /// Branch-and-bound search in progress.
    Search,
    /// A new incumbent solution has been accepted.
    Incumbent,
    /// The search has ended.
    Finished,
}

/// Read-only snapshot of solve progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Time since the solve started.
    pub elapsed: Duration,
    /// Objective value of the best incumbent, if any.
    pub best_objective: Option<f64>,
    /// Best proven bound on the objective, if the engine reports one.
    pub best_bound: Option<f64>,
    /// Current solving phase.
    pub phase: SolvePhase,
}

/// Shared early-stop flag. Observers may request an abort; engines honor
/// it where they support interruption.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A solve-progress observer.
pub trait ProgressObserver {
    /// Invoked on engine progress events.
    fn on_progress(&mut self, info: &ProgressInfo, abort: &AbortHandle);

    /// Invoked when a new incumbent is available, with read access to the
    /// partial schedule.
    fn on_incumbent(
        &mut self,
        info: &ProgressInfo,
        model: &Model,
        view: &dyn TimetableView,
        abort: &AbortHandle,
    ) {
        let _ = (info, model, view, abort);
    }
}

/// Aborts the solve once no better incumbent has been found for a fixed
/// amount of time.
pub struct StagnationFinisher {
    time_limit: Duration,
    last_result_at: Duration,
    last_result: f64,
}

impl StagnationFinisher {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            last_result_at: Duration::ZERO,
            last_result: f64::MAX,
        }
    }
}

impl ProgressObserver for StagnationFinisher {
    fn on_progress(&mut self, info: &ProgressInfo, abort: &AbortHandle) {
        if info.phase != SolvePhase::Search && info.phase != SolvePhase::Incumbent {
            return;
        }
        if let Some(objective) = info.best_objective {
            if objective < self.last_result {
                self.last_result = objective;
                self.last_result_at = info.elapsed;
            }
        }
        if info.elapsed > self.last_result_at + self.time_limit {
            info!(
                "no better solution found during the last {}s, stopping",
                self.time_limit.as_secs()
            );
            abort.request_abort();
        }
    }
}

/// Periodically reports how far the incumbent is from the proven bound,
/// but only when the distance improves.
pub struct GapLogger {
    report_interval: Duration,
    last_report_at: Duration,
    best_distance: i64,
}

impl GapLogger {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            report_interval,
            last_report_at: Duration::ZERO,
            best_distance: i64::MAX,
        }
    }
}

impl ProgressObserver for GapLogger {
    fn on_progress(&mut self, info: &ProgressInfo, _abort: &AbortHandle) {
        if info.phase != SolvePhase::Search && info.phase != SolvePhase::Incumbent {
            return;
        }
        if info.elapsed < self.last_report_at + self.report_interval {
            return;
        }
        let (Some(objective), Some(bound)) = (info.best_objective, info.best_bound) else {
            return;
        };

        // Round pessimistically on both sides.
        let distance = objective.ceil() as i64 - bound.floor() as i64;
        if distance < self.best_distance {
            info!(
                "current solution is no more than {} points from optimality ({}s used)",
                distance,
                info.elapsed.as_secs()
            );
            self.best_distance = distance;
        }
        self.last_report_at = info.elapsed;
    }
}

/// Re-exports the timetable each time the engine accepts an incumbent, so
/// a browser pointed at the output folder shows solutions as they improve.
pub struct IntermediateResultExporter<'a> {
    exporter: &'a mut dyn Exporter,
}

impl<'a> IntermediateResultExporter<'a> {
    pub fn new(exporter: &'a mut dyn Exporter) -> Self {
        Self { exporter }
    }
}

impl ProgressObserver for IntermediateResultExporter<'_> {
    fn on_progress(&mut self, _info: &ProgressInfo, _abort: &AbortHandle) {}

    fn on_incumbent(
        &mut self,
        _info: &ProgressInfo,
        model: &Model,
        view: &dyn TimetableView,
        _abort: &AbortHandle,
    ) {
        // An observer must never kill the solve; log and carry on.
        if let Err(e) = self.exporter.export(model, view, false) {
            warn!("intermediate export failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(elapsed_secs: u64, objective: Option<f64>, bound: Option<f64>) -> ProgressInfo {
        ProgressInfo {
            elapsed: Duration::from_secs(elapsed_secs),
            best_objective: objective,
            best_bound: bound,
            phase: SolvePhase::Search,
        }
    }

    #[test]
    fn test_abort_handle_is_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_requested());
        clone.request_abort();
        assert!(handle.is_requested());
    }

    #[test]
    fn test_stagnation_finisher_aborts_after_timeout() {
        let mut finisher = StagnationFinisher::new(Duration::from_secs(10));
        let abort = AbortHandle::new();

        finisher.on_progress(&info(1, Some(50.0), None), &abort);
        assert!(!abort.is_requested());

        // Improvement resets the clock.
        finisher.on_progress(&info(8, Some(40.0), None), &abort);
        finisher.on_progress(&info(17, Some(40.0), None), &abort);
        assert!(!abort.is_requested());

        finisher.on_progress(&info(19, Some(40.0), None), &abort);
        assert!(abort.is_requested());
    }

    #[test]
    fn test_stagnation_finisher_ignores_other_phases() {
        let mut finisher = StagnationFinisher::new(Duration::from_secs(1));
        let abort = AbortHandle::new();
        let mut done = info(100, Some(40.0), None);
        done.phase = SolvePhase::Finished;
        finisher.on_progress(&done, &abort);
        assert!(!abort.is_requested());
    }

    #[test]
    fn test_gap_logger_tracks_best_distance() {
        let mut logger = GapLogger::new(Duration::from_secs(5));
        let abort = AbortHandle::new();

        logger.on_progress(&info(6, Some(20.4), Some(10.2)), &abort);
        assert_eq!(logger.best_distance, 11); // ceil(20.4) - floor(10.2)

        // Within the report interval: no update.
        logger.on_progress(&info(7, Some(15.0), Some(10.0)), &abort);
        assert_eq!(logger.best_distance, 11);

        logger.on_progress(&info(12, Some(15.0), Some(10.0)), &abort);
        assert_eq!(logger.best_distance, 5);
    }
}
