//! Progress spinner for CLI operations.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use std::time::Duration;

/// CLI spinner showing listed entries, bytes, speed, and elapsed time.
///
/// The total is unknown up front since nested archives are discovered while
/// walking, so the position counts bytes. Automatically cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    label: String,
    entries: u64,
    bytes: u64,
}

impl CliProgress {
    /// Creates a new CLI spinner.
    ///
    /// # Arguments
    ///
    /// * `message` - Message to display (e.g., "Listing")
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // Template: "⠋ Listing 42 files (15.2 MB, 5.1 MB/s, 12s)"
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg} ({bytes}, {bytes_per_sec}, {elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .with_key("bytes", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_bytes(state.pos())).unwrap_or(());
                })
                .with_key("bytes_per_sec", |state: &ProgressState, w: &mut dyn Write| {
                    let per_sec = state.per_sec();
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let bytes_per_sec = per_sec as u64;
                    write!(w, "{}/s", humanize_bytes(bytes_per_sec)).unwrap_or(());
                })
                .with_key("elapsed", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.elapsed())).unwrap_or(());
                }),
        );

        bar.set_message(format!("{message} 0 files"));
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            label: message.to_string(),
            entries: 0,
            bytes: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    ///
    /// The spinner draws on stderr so it never mixes with the listing.
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    /// Records one listed entry of `bytes` bytes.
    pub fn on_entry(&mut self, bytes: u64) {
        self.entries += 1;
        self.bytes += bytes;
        self.bar.set_position(self.bytes);
        self.bar
            .set_message(format!("{} {} files", self.label, self.entries));
    }

    /// Clears the spinner.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(512), "512 B");
        assert_eq!(humanize_bytes(1024), "1.0 KB");
        assert_eq!(humanize_bytes(1536), "1.5 KB");
        assert_eq!(humanize_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(humanize_bytes(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(humanize_bytes(1024_u64.pow(4)), "1.0 TB");
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(std::time::Duration::from_secs(0)), "0s");
        assert_eq!(humanize_duration(std::time::Duration::from_secs(30)), "30s");
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(90)),
            "1m30s"
        );
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(3661)),
            "1h1m"
        );
    }

    #[test]
    fn test_progress_counts() {
        let mut progress = CliProgress::new("Testing");

        progress.on_entry(1024);
        progress.on_entry(512);

        assert_eq!(progress.entries, 2);
        assert_eq!(progress.bytes, 1536);
    }
}
