//! Error types for recursive extraction runs.

use std::time::Duration;

use thiserror::Error;

use crate::formats::ArchiveKind;
use crate::report::RunState;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// The budget cap that refused a reservation.
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetResource {
    /// Absolute byte cap (`max_extracted_bytes`) would be exceeded.
    TotalBytes {
        /// Bytes requested by the refused reservation.
        requested: u64,
        /// Bytes already committed when the request arrived.
        current: u64,
        /// Configured absolute cap.
        max: u64,
    },
    /// Ratio cap (`original_size * max_extracted_bytes_ratio`) would be
    /// exceeded.
    Ratio {
        /// Bytes requested by the refused reservation.
        requested: u64,
        /// Bytes already committed when the request arrived.
        current: u64,
        /// Effective cap in bytes.
        max: u64,
        /// Size of the root input.
        original_size: u64,
        /// Configured expansion ratio.
        ratio: f64,
    },
    /// Integer overflow detected while adding to the byte counter.
    IntegerOverflow,
}

impl std::fmt::Display for BudgetResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalBytes {
                requested,
                current,
                max,
            } => {
                write!(
                    f,
                    "budget exceeded: total bytes ({current} + {requested} > {max})"
                )
            }
            Self::Ratio {
                requested,
                current,
                max,
                original_size,
                ratio,
            } => {
                write!(
                    f,
                    "budget exceeded: expansion ratio ({current} + {requested} > {max}, {ratio:.2}x of {original_size} bytes)"
                )
            }
            Self::IntegerOverflow => {
                write!(f, "budget exceeded: integer overflow in byte counter")
            }
        }
    }
}

/// Errors that can end an extraction run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Reading the root stream or spill storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A container's bytes could not be decoded as its detected format.
    #[error("failed to decode {format} container '{path}': {reason}")]
    DecodeFailure {
        /// Logical path of the container.
        path: String,
        /// Format the container was decoded as.
        format: ArchiveKind,
        /// Decoder-supplied reason.
        reason: String,
    },

    /// A byte budget cap was hit.
    #[error("{resource}")]
    BudgetExceeded {
        /// The cap that refused the reservation.
        resource: BudgetResource,
    },

    /// The wall-clock limit was hit.
    #[error("extraction timed out after {elapsed:?} (limit {limit:?})")]
    TimeoutExceeded {
        /// Time elapsed since the run started.
        elapsed: Duration,
        /// Configured timeout.
        limit: Duration,
    },

    /// Containers are nested deeper than `max_depth`.
    #[error("archive nesting too deep at '{path}' (depth {depth} > {max})")]
    RecursionTooDeep {
        /// Logical path of the container that crossed the limit.
        path: String,
        /// Depth of that container.
        depth: usize,
        /// Configured maximum depth.
        max: usize,
    },

    /// The run was cancelled by the caller.
    #[error("extraction cancelled")]
    Cancelled,

    /// Extractor options failed validation.
    #[error("invalid extractor options: {reason}")]
    InvalidOptions {
        /// Which option is wrong and why.
        reason: String,
    },
}

impl ExtractionError {
    /// Builds a `DecodeFailure` for the container at `path`.
    pub fn decode(path: &str, format: ArchiveKind, reason: impl std::fmt::Display) -> Self {
        Self::DecodeFailure {
            path: path.to_string(),
            format,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if this error is one of the configured run limits.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestex_core::ExtractionError;
    /// use nestex_core::error::BudgetResource;
    ///
    /// let err = ExtractionError::BudgetExceeded {
    ///     resource: BudgetResource::IntegerOverflow,
    /// };
    /// assert!(err.is_limit_exceeded());
    ///
    /// assert!(!ExtractionError::Cancelled.is_limit_exceeded());
    /// ```
    #[must_use]
    pub const fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            Self::BudgetExceeded { .. }
                | Self::TimeoutExceeded { .. }
                | Self::RecursionTooDeep { .. }
        )
    }

    /// Returns `true` if the fallback policy may recover from this error.
    ///
    /// Only a container that failed to decode can be replaced by a fallback
    /// entry. Every other kind ends the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DecodeFailure { .. })
    }

    /// Returns the terminal run state this error leads to.
    #[must_use]
    pub const fn terminal_state(&self) -> RunState {
        match self {
            Self::BudgetExceeded { .. } => RunState::BudgetExceeded,
            Self::TimeoutExceeded { .. } => RunState::TimedOut,
            Self::Cancelled => RunState::Cancelled,
            _ => RunState::Failed,
        }
    }

    /// Returns the budget cap that was exceeded, if applicable.
    #[must_use]
    pub const fn budget_resource(&self) -> Option<&BudgetResource> {
        match self {
            Self::BudgetExceeded { resource } => Some(resource),
            _ => None,
        }
    }
}
