//! Error conversion utilities for CLI.
//!
//! Converts nestex-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::Result;
use anyhow::anyhow;
use nestex_core::BudgetResource;
use nestex_core::ExtractionError;
use std::path::Path;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::BudgetExceeded {
            resource: resource @ BudgetResource::Ratio { .. },
        } => {
            anyhow!(
                "Archive '{}' expands too far: {}\n\
                 HINT: This may be a decompression bomb. Use --ratio to allow a higher expansion if the source is trusted.",
                archive.display(),
                resource
            )
        }
        ExtractionError::BudgetExceeded { resource } => {
            anyhow!(
                "Extraction limit exceeded for '{}': {}\n\
                 HINT: Use --max-bytes to raise the limit.",
                archive.display(),
                resource
            )
        }
        ExtractionError::TimeoutExceeded { elapsed, limit } => {
            anyhow!(
                "Listing '{}' timed out after {:.1}s (limit {}s)\n\
                 HINT: Use --timeout to allow more time.",
                archive.display(),
                elapsed.as_secs_f64(),
                limit.as_secs()
            )
        }
        ExtractionError::RecursionTooDeep { path, depth, max } => {
            anyhow!(
                "Archive '{}' nests too deeply at '{}' (depth {depth}, maximum {max})\n\
                 HINT: Use --max-depth to allow deeper nesting.",
                archive.display(),
                path
            )
        }
        ExtractionError::DecodeFailure {
            path,
            format,
            reason,
        } => {
            anyhow!(
                "Invalid {format} archive '{}' in '{}': {}\n\
                 HINT: The archive may be corrupted. Omit --no-fallback to list it as a plain file.",
                path,
                archive.display(),
                reason
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        ExtractionError::InvalidOptions { reason } => anyhow!("Invalid options: {reason}"),
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}
