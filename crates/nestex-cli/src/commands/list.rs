//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::error::convert_extraction_error;
use crate::output::ListStyle;
use crate::output::ListedEntry;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use nestex_core::ExtractionSource;
use nestex_core::Extractor;
use std::ops::ControlFlow;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    let extractor = add_archive_context(Extractor::new(args.to_options()), &args.archive)?;
    let source = add_archive_context(ExtractionSource::open(&args.archive), &args.archive)?;

    // Only the listing is kept, entry contents are dropped as they arrive
    let mut progress = (!quiet && CliProgress::should_show()).then(|| CliProgress::new("Listing"));
    let mut listed = Vec::new();
    let outcome = extractor.walk(source, |entry| {
        if let Some(progress) = progress.as_mut() {
            progress.on_entry(entry.length());
        }
        listed.push(ListedEntry::from(&entry));
        ControlFlow::Continue(())
    });
    if let Some(progress) = &progress {
        progress.finish();
    }

    let style = ListStyle {
        long: args.long,
        human_readable: args.human_readable,
    };
    formatter.format_listing(&listed, &outcome.report, style)?;

    // Limits end a lenient listing quietly, real failures never do
    match outcome.error {
        Some(err) if args.strict || !err.is_limit_exceeded() => {
            Err(convert_extraction_error(err, &args.archive))
        }
        Some(err) => {
            tracing::debug!(error = %err, "listing ended early");
            Ok(())
        }
        None => Ok(()),
    }
}
