//! Output formatter trait for CLI results.

use anyhow::Result;
use nestex_core::ExtractedEntry;
use nestex_core::ExtractionReport;
use serde::Serialize;

/// One listed leaf. The content itself is not kept.
#[derive(Debug, Clone, Serialize)]
pub struct ListedEntry {
    pub path: String,
    pub size: u64,
    pub failed_container: bool,
}

impl From<&ExtractedEntry> for ListedEntry {
    fn from(entry: &ExtractedEntry) -> Self {
        Self {
            path: entry.path().to_string(),
            size: entry.length(),
            failed_container: entry.is_failed_container(),
        }
    }
}

/// Layout flags of the `list` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListStyle {
    pub long: bool,
    pub human_readable: bool,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the entries of a listing and the run that produced them
    fn format_listing(
        &self,
        entries: &[ListedEntry],
        report: &ExtractionReport,
        style: ListStyle,
    ) -> Result<()>;
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// The run stopped early; `data` holds what was listed before
    Incomplete,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn incomplete(operation: impl Into<String>, data: T, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Incomplete,
            data: Some(data),
            error: Some(reason.into()),
        }
    }
}
