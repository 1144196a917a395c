//! Resource limits for extraction runs.

pub mod budget;
pub mod cancel;

// Re-export public types
pub use budget::ExtractionBudget;
pub use cancel::CancellationToken;
