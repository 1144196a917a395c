//! Extractor configuration.

use std::time::Duration;

use crate::ExtractionError;
use crate::Result;

/// Options for one extraction run.
///
/// An [`Extractor`](crate::Extractor) keeps its options behind an `Arc` and
/// never mutates them, so concurrent runs cannot observe each other's
/// configuration.
///
/// # Examples
///
/// ```
/// use nestex_core::ExtractorOptions;
/// use std::time::Duration;
///
/// // Library defaults: 60x ratio cap, no absolute cap, no timeout
/// let options = ExtractorOptions::default();
/// assert_eq!(options.max_extracted_bytes_ratio, 60.0);
///
/// // Hardened for untrusted uploads
/// let hardened = ExtractorOptions::default()
///     .with_max_extracted_bytes(512 * 1024 * 1024)
///     .with_timeout(Some(Duration::from_secs(30)))
///     .with_extract_self_on_fail(false);
/// assert!(hardened.enable_timing);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Maximum number of items processed per parallel chunk.
    ///
    /// Also bounds how many extracted entries the streaming iterator buffers
    /// ahead of the consumer.
    pub batch_size: usize,

    /// Decode the containers of one batch concurrently.
    pub parallel: bool,

    /// Enforce `timeout`.
    pub enable_timing: bool,

    /// Wall-clock limit for a run, only enforced when `enable_timing` is set.
    pub timeout: Duration,

    /// Yield a container that failed to decode as a single raw entry instead
    /// of failing the run.
    pub extract_self_on_fail: bool,

    /// Absolute cap on extracted bytes (0 = unlimited).
    pub max_extracted_bytes: u64,

    /// Cap on extracted bytes as a multiple of the input size.
    pub max_extracted_bytes_ratio: f64,

    /// Maximum container nesting depth. The root container is depth 0.
    pub max_depth: usize,

    /// Decode nested containers. When false only the root is decoded.
    pub recurse: bool,

    /// Entries larger than this are spilled to a temporary file.
    pub memory_stream_cutoff: u64,

    /// Extensions that are never decoded (e.g. `"jar"`, `".docx"`).
    pub raw_extensions: Vec<String>,

    /// If non-empty, only leaves matching one of these patterns are yielded.
    pub allow_filters: Vec<String>,

    /// Leaves matching any of these patterns are not yielded.
    pub deny_filters: Vec<String>,
}

impl Default for ExtractorOptions {
    /// Default values:
    /// - `batch_size`: 50
    /// - `parallel`: false
    /// - `enable_timing`: false
    /// - `timeout`: 300 s
    /// - `extract_self_on_fail`: true
    /// - `max_extracted_bytes`: 0 (unlimited)
    /// - `max_extracted_bytes_ratio`: 60.0
    /// - `max_depth`: 64
    /// - `recurse`: true
    /// - `memory_stream_cutoff`: 100 MiB
    /// - filters and raw extensions: empty
    fn default() -> Self {
        Self {
            batch_size: 50,
            parallel: false,
            enable_timing: false,
            timeout: Duration::from_secs(300),
            extract_self_on_fail: true,
            max_extracted_bytes: 0,
            max_extracted_bytes_ratio: 60.0,
            max_depth: 64,
            recurse: true,
            memory_stream_cutoff: 100 * 1024 * 1024, // 100 MiB
            raw_extensions: Vec::new(),
            allow_filters: Vec::new(),
            deny_filters: Vec::new(),
        }
    }
}

impl ExtractorOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for trusted input: no byte or ratio cap, no timeout.
    ///
    /// The depth guard stays in place.
    #[must_use]
    pub fn trusted() -> Self {
        Self {
            max_extracted_bytes: 0,
            max_extracted_bytes_ratio: f64::INFINITY,
            enable_timing: false,
            ..Default::default()
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables or disables parallel decoding of sibling containers.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the timeout. `Some` enables timing, `None` disables it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(limit) => {
                self.enable_timing = true;
                self.timeout = limit;
            }
            None => self.enable_timing = false,
        }
        self
    }

    /// Sets whether failed containers are yielded as raw entries.
    #[must_use]
    pub fn with_extract_self_on_fail(mut self, enabled: bool) -> Self {
        self.extract_self_on_fail = enabled;
        self
    }

    /// Sets the absolute byte cap (0 = unlimited).
    #[must_use]
    pub fn with_max_extracted_bytes(mut self, max: u64) -> Self {
        self.max_extracted_bytes = max;
        self
    }

    /// Sets the expansion ratio cap.
    #[must_use]
    pub fn with_max_extracted_bytes_ratio(mut self, ratio: f64) -> Self {
        self.max_extracted_bytes_ratio = ratio;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets whether nested containers are decoded.
    #[must_use]
    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Sets the in-memory size limit before entries spill to disk.
    #[must_use]
    pub fn with_memory_stream_cutoff(mut self, cutoff: u64) -> Self {
        self.memory_stream_cutoff = cutoff;
        self
    }

    /// Sets the extensions that are never decoded.
    #[must_use]
    pub fn with_raw_extensions(mut self, extensions: Vec<String>) -> Self {
        self.raw_extensions = extensions;
        self
    }

    /// Sets the allow patterns.
    #[must_use]
    pub fn with_allow_filters(mut self, patterns: Vec<String>) -> Self {
        self.allow_filters = patterns;
        self
    }

    /// Sets the deny patterns.
    #[must_use]
    pub fn with_deny_filters(mut self, patterns: Vec<String>) -> Self {
        self.deny_filters = patterns;
        self
    }

    /// Returns the timeout if timing is enabled.
    #[must_use]
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.enable_timing.then_some(self.timeout)
    }

    /// Returns `true` if `name` carries one of the raw extensions.
    ///
    /// Comparison is case-insensitive and tolerates a leading dot in the
    /// configured extension.
    #[must_use]
    pub fn is_raw_name(&self, name: &str) -> bool {
        if self.raw_extensions.is_empty() {
            return false;
        }
        let Some((_, extension)) = name.rsplit_once('.') else {
            return false;
        };
        self.raw_extensions
            .iter()
            .any(|raw| raw.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if:
    /// - `batch_size` is 0
    /// - `max_extracted_bytes_ratio` is NaN or not positive
    /// - `max_depth` is 0
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ExtractionError::InvalidOptions {
                reason: "batch_size must be at least 1".into(),
            });
        }
        if self.max_extracted_bytes_ratio.is_nan() || self.max_extracted_bytes_ratio <= 0.0 {
            return Err(ExtractionError::InvalidOptions {
                reason: format!(
                    "max_extracted_bytes_ratio must be positive, got {}",
                    self.max_extracted_bytes_ratio
                ),
            });
        }
        if self.max_depth == 0 {
            return Err(ExtractionError::InvalidOptions {
                reason: "max_depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}
