//! Recursive extraction: controller, fallback policy, filters and the
//! streaming iterator.

pub mod engine;
pub mod fallback;
pub mod filters;
pub mod stream;

pub use engine::EntrySink;
pub use fallback::FallbackDecision;
pub use filters::EntryFilter;
pub use stream::Extraction;
