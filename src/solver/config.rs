//! Solve configuration.

/// Options handed to the engine for one solve.
///
/// # Examples
///
/// ```
/// use timetabler::solver::SolveConfig;
///
/// let config = SolveConfig::default().with_threads(4).quiet();
/// assert_eq!(config.threads, Some(4));
/// assert!(!config.print_reports);
/// ```
#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Print the model statistics and result tables to stdout.
    pub print_reports: bool,

    /// Desired worker thread count, passed through to engines that
    /// parallelize their search. `None` leaves the engine default.
    pub threads: Option<usize>,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            print_reports: true,
            threads: None,
        }
    }
}

impl SolveConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Suppresses the stdout report tables.
    pub fn quiet(mut self) -> Self {
        self.print_reports = false;
        self
    }
}
