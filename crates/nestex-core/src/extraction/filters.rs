//! Allow/deny filtering of leaf entries.

use crate::ExtractorOptions;

/// Decides which leaves reach the consumer.
///
/// A leaf is yielded if it matches no deny pattern and, when allow patterns
/// are configured, at least one allow pattern. Filtered leaves are still
/// materialized and charged; filtering only hides them.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl EntryFilter {
    /// Builds a filter from the options' allow and deny patterns.
    #[must_use]
    pub fn from_options(options: &ExtractorOptions) -> Self {
        Self {
            allow: options.allow_filters.clone(),
            deny: options.deny_filters.clone(),
        }
    }

    /// Returns `true` if no pattern is configured.
    #[must_use]
    pub fn is_pass_all(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// Returns `true` if the leaf at `path` should be yielded.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestex_core::ExtractorOptions;
    /// use nestex_core::extraction::EntryFilter;
    ///
    /// let options = ExtractorOptions::default()
    ///     .with_allow_filters(vec!["*.txt".into()])
    ///     .with_deny_filters(vec!["secret*".into()]);
    /// let filter = EntryFilter::from_options(&options);
    ///
    /// assert!(filter.allows("bundle.zip/docs/readme.txt"));
    /// assert!(!filter.allows("bundle.zip/docs/secret.txt"));
    /// assert!(!filter.allows("bundle.zip/logo.png"));
    /// ```
    #[must_use]
    pub fn allows(&self, path: &str) -> bool {
        if self.deny.iter().any(|pattern| matches_pattern(path, pattern)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|pattern| matches_pattern(path, pattern))
    }
}

/// Matches a logical path against a glob-style pattern.
///
/// Supports:
/// - Exact match: `"Thumbs.db"` matches that segment anywhere in the path
/// - Suffix wildcard: `"*.txt"` matches paths ending with `.txt`
/// - Prefix wildcard: `"temp*"` matches segments starting with `temp`
///
/// Each `/`-separated segment is tried, then the full path.
#[must_use]
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    path.split('/')
        .any(|segment| !segment.is_empty() && pattern_matches(segment, pattern))
        || pattern_matches(path, pattern)
}

/// Matches a string against a simple glob pattern.
fn pattern_matches(s: &str, pattern: &str) -> bool {
    if pattern == s {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return s.starts_with(prefix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return s.ends_with(suffix);
    }

    false
}
