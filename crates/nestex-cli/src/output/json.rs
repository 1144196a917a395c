//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::ListStyle;
use super::formatter::ListedEntry;
use super::formatter::OutputFormatter;
use anyhow::Result;
use nestex_core::ExtractionReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

#[derive(Serialize)]
struct ListOutput<'a> {
    state: &'static str,
    entries: &'a [ListedEntry],
    entries_yielded: usize,
    failed_containers: usize,
    containers_decoded: usize,
    entries_filtered: usize,
    bytes_extracted: u64,
    bytes_yielded: u64,
    original_size: u64,
    max_depth_reached: usize,
    duration_ms: u128,
}

impl<'a> ListOutput<'a> {
    fn new(entries: &'a [ListedEntry], report: &ExtractionReport) -> Self {
        Self {
            state: report.state.as_str(),
            entries,
            entries_yielded: report.entries_yielded,
            failed_containers: report.failed_containers,
            containers_decoded: report.containers_decoded,
            entries_filtered: report.entries_filtered,
            bytes_extracted: report.bytes_extracted,
            bytes_yielded: report.bytes_yielded,
            original_size: report.original_size,
            max_depth_reached: report.max_depth_reached,
            duration_ms: report.duration.as_millis(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_listing(
        &self,
        entries: &[ListedEntry],
        report: &ExtractionReport,
        _style: ListStyle,
    ) -> Result<()> {
        let data = ListOutput::new(entries, report);
        match &report.termination_reason {
            Some(reason) => Self::output(&JsonOutput::incomplete("list", data, reason.as_str())),
            None => Self::output(&JsonOutput::success("list", data)),
        }
    }
}
