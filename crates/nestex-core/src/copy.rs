//! Budgeted materialization of entry streams.
//!
//! Every byte an entry produces is reserved against the run budget before it
//! is stored. When the decoder knows the entry size up front the whole size
//! is reserved before the first read, so an oversized entry is refused
//! without decompressing anything.
//!
//! # Security Guarantees
//!
//! - Byte counters use checked arithmetic
//! - A chunk is stored only after its bytes were reserved
//! - Cancellation is polled once per chunk

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::ExtractionError;
use crate::Result;
use crate::error::BudgetResource;
use crate::io::ContentWriter;
use crate::io::EntryContent;
use crate::security::CancellationToken;
use crate::security::ExtractionBudget;

/// Read chunk size (64KB).
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stack-allocated buffer reused across entries of one branch.
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zeroed buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies entry streams into [`EntryContent`] under a run budget.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    budget: &'a ExtractionBudget,
    cancel: &'a CancellationToken,
    memory_cutoff: u64,
}

impl<'a> Materializer<'a> {
    /// Creates a materializer charging `budget` and polling `cancel`.
    #[must_use]
    pub fn new(
        budget: &'a ExtractionBudget,
        cancel: &'a CancellationToken,
        memory_cutoff: u64,
    ) -> Self {
        Self {
            budget,
            cancel,
            memory_cutoff,
        }
    }

    /// Reads `reader` to the end and returns its bytes.
    ///
    /// `size_hint` is reserved before the first read. Bytes beyond the hint
    /// are reserved chunk by chunk. `on_read_error` turns a failure of the
    /// source stream into the error the caller wants to report; failures of
    /// spill storage are reported as `Io`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The budget refuses a reservation (`BudgetExceeded`)
    /// - The run was cancelled (`Cancelled`)
    /// - The source stream fails (mapped by `on_read_error`)
    /// - Spill storage fails (`Io`)
    ///
    /// # Examples
    ///
    /// ```
    /// use nestex_core::{ExtractionError, ExtractorOptions};
    /// use nestex_core::copy::{CopyBuffer, Materializer};
    /// use nestex_core::security::{CancellationToken, ExtractionBudget};
    ///
    /// let options = ExtractorOptions::default();
    /// let budget = ExtractionBudget::new(1, &options);
    /// let cancel = CancellationToken::new();
    /// let materializer = Materializer::new(&budget, &cancel, 1024);
    ///
    /// let mut buffer = CopyBuffer::new();
    /// let mut input: &[u8] = b"hello";
    /// let content = materializer.materialize(&mut input, None, &mut buffer, ExtractionError::Io)?;
    /// assert_eq!(content.len(), 5);
    /// assert_eq!(budget.total_extracted(), 5);
    /// # Ok::<(), nestex_core::ExtractionError>(())
    /// ```
    pub fn materialize<R, F>(
        &self,
        reader: &mut R,
        size_hint: Option<u64>,
        buffer: &mut CopyBuffer,
        on_read_error: F,
    ) -> Result<EntryContent>
    where
        R: Read + ?Sized,
        F: FnOnce(io::Error) -> ExtractionError,
    {
        self.cancel.check()?;

        let mut reserved: u64 = 0;
        if let Some(hint) = size_hint {
            self.budget.try_reserve(hint)?;
            reserved = hint;
        }

        let mut writer = ContentWriter::new(self.memory_cutoff, size_hint);
        let mut total: u64 = 0;

        loop {
            self.cancel.check()?;

            let bytes_read = match reader.read(&mut buffer.buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(on_read_error(e)),
            };

            // SECURITY: Detect overflow to prevent cap bypass
            total = total
                .checked_add(bytes_read as u64)
                .ok_or(ExtractionError::BudgetExceeded {
                    resource: BudgetResource::IntegerOverflow,
                })?;

            if total > reserved {
                self.budget.try_reserve(total - reserved)?;
                reserved = total;
            }

            writer.write_all(&buffer.buf[..bytes_read])?;
        }

        Ok(writer.finish()?)
    }
}
