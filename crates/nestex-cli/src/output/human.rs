//! Human-readable output formatter with colors and styling.

use super::formatter::ListStyle;
use super::formatter::ListedEntry;
use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use nestex_core::ExtractionReport;
use nestex_core::RunState;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn format_entry(entry: &ListedEntry, style: ListStyle) -> String {
        if !style.long {
            return entry.path.clone();
        }
        let size_str = if style.human_readable {
            Self::format_size(entry.size)
        } else {
            entry.size.to_string()
        };
        // '!' marks a nested archive that failed to decode
        let marker = if entry.failed_container { '!' } else { '-' };
        format!("{marker} {size_str:>10}  {}", entry.path)
    }

    fn write_summary(&self, report: &ExtractionReport) {
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} files, {}",
            Self::format_number(report.entries_yielded),
            Self::format_size(report.bytes_yielded)
        ));

        if report.failed_containers > 0 {
            let _ = self.term.write_line(&format!(
                "  Undecodable archives listed as files: {}",
                report.failed_containers
            ));
        }

        if self.verbose {
            let _ = self.term.write_line(&format!(
                "  Archives decoded: {}",
                Self::format_number(report.containers_decoded)
            ));
            let _ = self
                .term
                .write_line(&format!("  Filtered out: {}", report.entries_filtered));
            let _ = self.term.write_line(&format!(
                "  Bytes extracted: {}",
                Self::format_size(report.bytes_extracted)
            ));
            if let Some(ratio) = report.expansion_ratio() {
                let _ = self
                    .term
                    .write_line(&format!("  Expansion: {ratio:.1}x"));
            }
            let _ = self
                .term
                .write_line(&format!("  Deepest nesting: {}", report.max_depth_reached));
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }
    }

    fn write_warning(&self, message: &str) {
        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} {message}",
                style("WARNING:").yellow().bold()
            ));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_listing(
        &self,
        entries: &[ListedEntry],
        report: &ExtractionReport,
        style: ListStyle,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for entry in entries {
            let _ = self.term.write_line(&Self::format_entry(entry, style));
        }

        if style.long || self.verbose {
            self.write_summary(report);
        }

        if report.state != RunState::Completed {
            let reason = report
                .termination_reason
                .as_deref()
                .unwrap_or("no reason recorded");
            self.write_warning(&format!("listing stopped early ({}): {reason}", report.state));
        }

        Ok(())
    }
}
