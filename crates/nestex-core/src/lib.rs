//! Bounded recursive archive extraction.
//!
//! `nestex-core` walks an archive and every archive nested inside it, and
//! yields the leaf files as a lazy sequence. Every run is held to a byte
//! budget (absolute and as a multiple of the input size), an optional
//! wall-clock timeout and a nesting depth limit, so decompression bombs and
//! endlessly nested archives stop early instead of exhausting the host.
//!
//! Supported containers: zip, tar, 7z, gzip, bzip2, xz and zstd. A container
//! that fails to decode can be yielded as one raw entry instead of failing
//! the run.
//!
//! # Examples
//!
//! ```no_run
//! use nestex_core::{ExtractionSource, Extractor, ExtractorOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ExtractorOptions::default().with_max_extracted_bytes(1 << 30);
//! let extractor = Extractor::new(options)?;
//!
//! let mut extraction = extractor.extract(ExtractionSource::open("upload.zip")?)?;
//! for entry in extraction.by_ref() {
//!     let entry = entry?;
//!     println!("{} ({} bytes)", entry.path(), entry.length());
//! }
//! println!("run ended: {}", extraction.state());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod entry;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod io;
pub mod report;
pub mod security;
pub mod source;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::Extractor;
pub use api::extract_archive;
pub use config::ExtractorOptions;
pub use entry::ExtractedEntry;
pub use error::BudgetResource;
pub use error::ExtractionError;
pub use error::Result;
pub use extraction::Extraction;
pub use report::ExtractionReport;
pub use report::RunOutcome;
pub use report::RunState;
pub use security::CancellationToken;
pub use source::ExtractionSource;
