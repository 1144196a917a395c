//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::ExtractionError;
use crate::Result;

/// Shared flag that asks a running extraction to stop.
///
/// Clones share the same flag. The extractor polls it before every container,
/// every entry and every read chunk.
///
/// # Examples
///
/// ```
/// use nestex_core::security::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// assert!(token.check().is_ok());
///
/// handle.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a token that is cancelled when either it or `self` is.
    ///
    /// Cancelling the child leaves `self` untouched.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.load(Ordering::Acquire))
    }

    /// Returns `Cancelled` once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Cancelled` if the token was cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        Ok(())
    }
}
