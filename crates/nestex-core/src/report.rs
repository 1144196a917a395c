//! Extraction run reporting.

use std::time::Duration;

use crate::ExtractionError;

/// Lifecycle of one extraction run.
///
/// `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// The run has not finished yet.
    #[default]
    Running,
    /// Every container was walked without hitting a limit.
    Completed,
    /// A byte or ratio cap was hit.
    BudgetExceeded,
    /// The wall-clock limit was hit.
    TimedOut,
    /// A decode, I/O or recursion error ended the run.
    Failed,
    /// The caller cancelled the run or dropped its consumer.
    Cancelled,
}

impl RunState {
    /// Returns `true` for every state except `Running`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::BudgetExceeded => "budget_exceeded",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Terminal state of the run.
    pub state: RunState,

    /// Leaf entries handed to the consumer.
    pub entries_yielded: usize,

    /// Fallback entries among `entries_yielded`.
    pub failed_containers: usize,

    /// Containers decoded successfully.
    pub containers_decoded: usize,

    /// Leaves dropped by allow/deny filters.
    pub entries_filtered: usize,

    /// Bytes charged against the budget.
    pub bytes_extracted: u64,

    /// Sum of `length` over yielded entries.
    pub bytes_yielded: u64,

    /// Declared size of the root input.
    pub original_size: u64,

    /// Deepest container nesting level reached.
    pub max_depth_reached: usize,

    /// Duration of the run.
    pub duration: Duration,

    /// Why the run ended early, if it did.
    pub termination_reason: Option<String>,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the run walked every container.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Returns bytes extracted per byte of input, if the input is non-empty.
    #[must_use]
    pub fn expansion_ratio(&self) -> Option<f64> {
        (self.original_size > 0).then(|| self.bytes_extracted as f64 / self.original_size as f64)
    }
}

/// Report plus the error that ended the run, if any.
///
/// This is the lenient view of a run. Use [`RunOutcome::into_result`] for the
/// strict view.
#[derive(Debug)]
pub struct RunOutcome {
    /// Run statistics.
    pub report: ExtractionReport,
    /// Error that ended the run early.
    pub error: Option<ExtractionError>,
}

impl RunOutcome {
    /// Returns the report, or the error that ended the run.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of any run that did not complete.
    pub fn into_result(self) -> crate::Result<ExtractionReport> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }

    /// Returns the terminal state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.report.state
    }
}
