//! Per-run byte, ratio and time budget.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use crate::ExtractionError;
use crate::ExtractorOptions;
use crate::Result;
use crate::error::BudgetResource;

/// Tracks bytes extracted and elapsed time for one run.
///
/// Reservations from every parallel branch go through a single mutex, so the
/// committed total never overshoots a cap. Once a reservation is refused the
/// budget stays exhausted and every later reservation fails with the same
/// resource.
///
/// # Examples
///
/// ```
/// use nestex_core::ExtractorOptions;
/// use nestex_core::security::ExtractionBudget;
///
/// let options = ExtractorOptions::default().with_max_extracted_bytes(100);
/// let budget = ExtractionBudget::new(10, &options);
///
/// assert!(budget.try_reserve(60).is_ok());
/// assert!(budget.try_reserve(41).is_err());
/// // Exhaustion is sticky
/// assert!(budget.try_reserve(1).is_err());
/// assert_eq!(budget.total_extracted(), 60);
/// ```
#[derive(Debug)]
pub struct ExtractionBudget {
    original_size: u64,
    max_bytes: Option<u64>,
    ratio: f64,
    ratio_cap: Option<u64>,
    ledger: Mutex<Ledger>,
    started: Instant,
    timeout: Option<Duration>,
}

#[derive(Debug, Default, Clone)]
struct Ledger {
    total: u64,
    exceeded: Option<BudgetResource>,
}

impl ExtractionBudget {
    /// Creates a budget for an input of `original_size` bytes.
    ///
    /// The clock starts now.
    #[must_use]
    pub fn new(original_size: u64, options: &ExtractorOptions) -> Self {
        let max_bytes = (options.max_extracted_bytes > 0).then_some(options.max_extracted_bytes);
        let ratio = options.max_extracted_bytes_ratio;
        // Float-to-int casts saturate, so an infinite ratio yields u64::MAX
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ratio_cap = (original_size > 0).then(|| (original_size as f64 * ratio) as u64);

        Self {
            original_size,
            max_bytes,
            ratio,
            ratio_cap,
            ledger: Mutex::new(Ledger::default()),
            started: Instant::now(),
            timeout: options.effective_timeout(),
        }
    }

    /// Commits `bytes` to the running total if every cap allows it.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the new total would pass the absolute cap
    /// or the ratio cap, if the counter would overflow, or if an earlier
    /// reservation already exhausted the budget.
    pub fn try_reserve(&self, bytes: u64) -> Result<()> {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(resource) = &ledger.exceeded {
            return Err(ExtractionError::BudgetExceeded {
                resource: resource.clone(),
            });
        }

        match self.check_caps(ledger.total, bytes) {
            Ok(new_total) => {
                ledger.total = new_total;
                Ok(())
            }
            Err(resource) => {
                ledger.exceeded = Some(resource.clone());
                Err(ExtractionError::BudgetExceeded { resource })
            }
        }
    }

    fn check_caps(&self, current: u64, requested: u64) -> std::result::Result<u64, BudgetResource> {
        // SECURITY: Detect overflow to prevent cap bypass
        let new_total = current
            .checked_add(requested)
            .ok_or(BudgetResource::IntegerOverflow)?;

        if let Some(max) = self.max_bytes
            && new_total > max
        {
            return Err(BudgetResource::TotalBytes {
                requested,
                current,
                max,
            });
        }

        if let Some(max) = self.ratio_cap
            && new_total > max
        {
            return Err(BudgetResource::Ratio {
                requested,
                current,
                max,
                original_size: self.original_size,
                ratio: self.ratio,
            });
        }

        Ok(new_total)
    }

    /// Returns a private copy of this budget as it stands now.
    ///
    /// The copy has the same caps, clock and committed total, but its
    /// reservations never reach this budget. A parallel branch decodes
    /// against a fork and the caller commits the branch's charges here once
    /// their order is settled.
    #[must_use]
    pub fn fork(&self) -> Self {
        let ledger = self
            .ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            original_size: self.original_size,
            max_bytes: self.max_bytes,
            ratio: self.ratio,
            ratio_cap: self.ratio_cap,
            ledger: Mutex::new(ledger),
            started: self.started,
            timeout: self.timeout,
        }
    }

    /// Fails once the configured timeout has elapsed.
    ///
    /// Always succeeds when timing is disabled.
    ///
    /// # Errors
    ///
    /// Returns `TimeoutExceeded` if the run has outlived its timeout.
    pub fn check_timeout(&self) -> Result<()> {
        let Some(limit) = self.timeout else {
            return Ok(());
        };
        let elapsed = self.started.elapsed();
        if elapsed > limit {
            return Err(ExtractionError::TimeoutExceeded { elapsed, limit });
        }
        Ok(())
    }

    /// Returns the bytes committed so far.
    #[must_use]
    pub fn total_extracted(&self) -> u64 {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Returns the bytes that can still be reserved, or `None` if no cap
    /// applies.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        let cap = match (self.max_bytes, self.ratio_cap) {
            (Some(a), Some(b)) => a.min(b),
            (Some(cap), None) | (None, Some(cap)) => cap,
            (None, None) => return None,
        };
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        if ledger.exceeded.is_some() {
            return Some(0);
        }
        Some(cap.saturating_sub(ledger.total))
    }

    /// Returns `true` once a reservation has been refused.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .exceeded
            .is_some()
    }

    /// Returns the size of the root input.
    #[must_use]
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Returns the time elapsed since the budget was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
