//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use nestex_core::ExtractorOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nestex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every file of an archive, descending into nested archives
    List(ListArgs),
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show size and fallback marker for each entry
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,

    /// Maximum total extracted size in bytes (0 = unlimited)
    #[arg(long, value_name = "SIZE", value_parser = parse_byte_size)]
    pub max_bytes: Option<u64>,

    /// Maximum extracted size as a multiple of the archive size
    #[arg(long, value_name = "RATIO", default_value = "60", value_parser = parse_ratio)]
    pub ratio: f64,

    /// Wall-clock limit in seconds (implies --timing)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Enforce the default 300 second wall-clock limit
    #[arg(long)]
    pub timing: bool,

    /// Fail instead of listing a corrupt nested archive as a file
    #[arg(long)]
    pub no_fallback: bool,

    /// Exit with an error when a limit stops the listing early
    #[arg(long)]
    pub strict: bool,

    /// Decode sibling archives in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Containers decoded per parallel batch
    #[arg(long, default_value = "50", value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// Maximum archive nesting depth
    #[arg(long, default_value = "64", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_depth: u64,

    /// Only decode the top-level archive
    #[arg(long)]
    pub no_recurse: bool,

    /// Only list paths matching this pattern (glob, can be repeated)
    #[arg(long = "allow", value_name = "PATTERN")]
    pub allow: Vec<String>,

    /// Hide paths matching this pattern (glob, can be repeated)
    #[arg(long = "deny", short = 'x', value_name = "PATTERN")]
    pub deny: Vec<String>,

    /// Never decode files with this extension (can be repeated)
    #[arg(long = "raw-extension", value_name = "EXT")]
    pub raw_extensions: Vec<String>,
}

impl ListArgs {
    /// Maps the flags onto extractor options.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_options(&self) -> ExtractorOptions {
        let mut options = ExtractorOptions::default()
            .with_max_extracted_bytes(self.max_bytes.unwrap_or(0))
            .with_max_extracted_bytes_ratio(self.ratio)
            .with_extract_self_on_fail(!self.no_fallback)
            .with_parallel(self.parallel)
            .with_batch_size(self.batch_size as usize)
            .with_max_depth(self.max_depth as usize)
            .with_recurse(!self.no_recurse)
            .with_allow_filters(self.allow.clone())
            .with_deny_filters(self.deny.clone())
            .with_raw_extensions(self.raw_extensions.clone());

        if let Some(secs) = self.timeout {
            options = options.with_timeout(Some(Duration::from_secs(secs)));
        } else if self.timing {
            options.enable_timing = true;
        }
        options
    }
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

/// Parse a strictly positive ratio. `inf` disables the ratio cap.
fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid ratio: {s}"))?;
    if ratio.is_nan() || ratio <= 0.0 {
        return Err(format!("ratio must be positive: {s}"));
    }
    Ok(ratio)
}
