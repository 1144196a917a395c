//! High-level public API for recursive extraction.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use crate::ExtractedEntry;
use crate::ExtractionSource;
use crate::ExtractorOptions;
use crate::Result;
use crate::extraction::Extraction;
use crate::extraction::engine;
use crate::formats::DecoderRegistry;
use crate::report::RunOutcome;
use crate::security::CancellationToken;

/// Recursive extractor bound to one set of options.
///
/// The options are validated once and then shared read-only by every run.
/// Each call to [`walk`](Self::walk) or [`extract`](Self::extract) gets its
/// own budget, so runs are independent and may execute concurrently.
///
/// # Examples
///
/// ```
/// use nestex_core::{ExtractionSource, Extractor, ExtractorOptions};
/// use nestex_core::test_utils::{create_test_tar, create_test_zip};
///
/// let tar = create_test_tar(vec![("inner.txt", b"nested")]);
/// let zip = create_test_zip(vec![("top.txt", b"top"), ("data.tar", &tar)]);
///
/// let extractor = Extractor::new(ExtractorOptions::default())?;
/// let entries = extractor.extract_all(ExtractionSource::from_bytes("bundle.zip", zip))?;
///
/// let paths: Vec<&str> = entries.iter().map(|e| e.path()).collect();
/// assert_eq!(paths, ["bundle.zip/top.txt", "bundle.zip/data.tar/inner.txt"]);
/// # Ok::<(), nestex_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    options: Arc<ExtractorOptions>,
    decoders: DecoderRegistry,
}

impl Extractor {
    /// Creates an extractor with the built-in decoders.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if the options fail validation.
    pub fn new(options: ExtractorOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options: Arc::new(options),
            decoders: DecoderRegistry::with_defaults(),
        })
    }

    /// Replaces the decoder registry.
    #[must_use]
    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    /// Options every run of this extractor uses.
    #[must_use]
    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Decoders available to this extractor.
    #[must_use]
    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    /// Runs to completion on the current thread, pushing each leaf into
    /// `sink`.
    ///
    /// Returning `ControlFlow::Break` from `sink` stops the run as
    /// cancelled. The returned outcome always carries a report; its error
    /// says why the run stopped early, if it did.
    pub fn walk<F>(&self, source: ExtractionSource, sink: F) -> RunOutcome
    where
        F: FnMut(ExtractedEntry) -> ControlFlow<()>,
    {
        self.walk_with_cancel(source, CancellationToken::new(), sink)
    }

    /// Same as [`walk`](Self::walk), stopping early once `cancel` fires.
    pub fn walk_with_cancel<F>(
        &self,
        source: ExtractionSource,
        cancel: CancellationToken,
        mut sink: F,
    ) -> RunOutcome
    where
        F: FnMut(ExtractedEntry) -> ControlFlow<()>,
    {
        engine::run(&self.options, &self.decoders, source, cancel, &mut sink)
    }

    /// Starts a run on a worker thread and returns its lazy entry sequence.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the worker thread cannot be spawned.
    pub fn extract(&self, source: ExtractionSource) -> Result<Extraction> {
        Extraction::spawn(Arc::clone(&self.options), self.decoders.clone(), source)
    }

    /// Collects every leaf, failing if the run stops early.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the run. Entries yielded before it are
    /// dropped.
    pub fn extract_all(&self, source: ExtractionSource) -> Result<Vec<ExtractedEntry>> {
        let mut entries = Vec::new();
        self.walk(source, |entry| {
            entries.push(entry);
            ControlFlow::Continue(())
        })
        .into_result()?;
        Ok(entries)
    }
}

/// Extracts every leaf of the archive at `path`.
///
/// Convenience wrapper around [`Extractor::extract_all`].
///
/// # Errors
///
/// Returns an error if:
/// - The options are invalid
/// - The file cannot be opened
/// - The run stops early for any reason
///
/// # Examples
///
/// ```no_run
/// use nestex_core::ExtractorOptions;
/// use nestex_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let entries = extract_archive("upload.zip", ExtractorOptions::default())?;
/// for entry in &entries {
///     println!("{} ({} bytes)", entry.path(), entry.length());
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_archive<P: AsRef<Path>>(
    path: P,
    options: ExtractorOptions,
) -> Result<Vec<ExtractedEntry>> {
    let extractor = Extractor::new(options)?;
    extractor.extract_all(ExtractionSource::open(path)?)
}
