//! Container formats and the decoder registry.

pub mod compression;
pub mod detect;
pub mod sevenz;
pub mod tar;
pub mod traits;
pub mod zip;

use std::collections::HashMap;
use std::sync::Arc;

// Re-export main types for convenience
pub use compression::CompressionCodec;
pub use compression::StreamDecoder;
pub use detect::ArchiveKind;
pub use sevenz::SevenZipDecoder;
pub use tar::TarDecoder;
pub use traits::ArchiveDecoder;
pub use traits::Container;
pub use traits::EntryVisitor;
pub use traits::RawEntry;
pub use zip::ZipDecoder;

/// Decoders available to an extractor, keyed by container kind.
///
/// A kind without a registered decoder is treated as a leaf.
///
/// # Examples
///
/// ```
/// use nestex_core::formats::{ArchiveKind, DecoderRegistry};
///
/// let registry = DecoderRegistry::with_defaults();
/// assert!(registry.supports(ArchiveKind::Zip));
/// assert!(!registry.supports(ArchiveKind::Raw));
///
/// let empty = DecoderRegistry::empty();
/// assert!(!empty.supports(ArchiveKind::Zip));
/// ```
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<ArchiveKind, Arc<dyn ArchiveDecoder>>,
}

impl DecoderRegistry {
    /// Creates a registry with no decoders.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in decoder.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(ZipDecoder)
            .with(TarDecoder)
            .with(SevenZipDecoder)
            .with(StreamDecoder::new(CompressionCodec::Gzip))
            .with(StreamDecoder::new(CompressionCodec::Bzip2))
            .with(StreamDecoder::new(CompressionCodec::Xz))
            .with(StreamDecoder::new(CompressionCodec::Zstd))
    }

    /// Registers `decoder` for its kind, replacing any previous one.
    pub fn register(&mut self, decoder: impl ArchiveDecoder + 'static) {
        self.decoders.insert(decoder.kind(), Arc::new(decoder));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, decoder: impl ArchiveDecoder + 'static) -> Self {
        self.register(decoder);
        self
    }

    /// Returns the decoder for `kind`.
    #[must_use]
    pub fn get(&self, kind: ArchiveKind) -> Option<&Arc<dyn ArchiveDecoder>> {
        self.decoders.get(&kind)
    }

    /// Returns `true` if a decoder is registered for `kind`.
    #[must_use]
    pub fn supports(&self, kind: ArchiveKind) -> bool {
        kind.is_container() && self.decoders.contains_key(&kind)
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.decoders.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
