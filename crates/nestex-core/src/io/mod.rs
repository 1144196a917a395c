//! Byte storage for extracted entries.
//!
//! Entries live in memory until they outgrow the configured cutoff, then
//! move to an anonymous temporary file.

pub mod content;

// Re-export main types for convenience
pub use content::ContentWriter;
pub use content::EntryContent;
