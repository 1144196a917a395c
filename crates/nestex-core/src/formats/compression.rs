//! Single-stream compression codecs.
//!
//! A compressed stream is a container holding exactly one entry: its
//! decompressed bytes. A `.tar.gz` is therefore two nesting levels, the gzip
//! stream and the tar archive inside it.
//!
//! # Supported Codecs
//!
//! - **Gzip** (.gz, .tgz), multi-member streams included
//! - **Bzip2** (.bz2, .tbz2), multi-stream files included
//! - **Xz** (.xz, .txz)
//! - **Zstd** (.zst, .tzst)

use std::io::Read;

use crate::ExtractionError;
use crate::Result;

use super::detect::ArchiveKind;
use super::traits::ArchiveDecoder;
use super::traits::Container;
use super::traits::EntryVisitor;
use super::traits::RawEntry;

/// Compression codec of a single-stream container.
///
/// # Examples
///
/// ```
/// use nestex_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::Gzip.inner_name("logs.tar.gz"), "logs.tar");
/// assert_eq!(CompressionCodec::Gzip.inner_name("logs.tgz"), "logs.tar");
/// assert_eq!(CompressionCodec::Zstd.inner_name("dump.sql.zst"), "dump.sql");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip compression (deflate algorithm).
    Gzip,
    /// Bzip2 compression (Burrows-Wheeler algorithm).
    Bzip2,
    /// Xz compression (LZMA2 algorithm).
    Xz,
    /// Zstd compression (Zstandard algorithm).
    Zstd,
}

impl CompressionCodec {
    /// Returns the codec for a container kind, if it is a single stream.
    #[must_use]
    pub const fn from_kind(kind: ArchiveKind) -> Option<Self> {
        match kind {
            ArchiveKind::Gzip => Some(Self::Gzip),
            ArchiveKind::Bzip2 => Some(Self::Bzip2),
            ArchiveKind::Xz => Some(Self::Xz),
            ArchiveKind::Zstd => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Returns the container kind of this codec.
    #[must_use]
    pub const fn kind(self) -> ArchiveKind {
        match self {
            Self::Gzip => ArchiveKind::Gzip,
            Self::Bzip2 => ArchiveKind::Bzip2,
            Self::Xz => ArchiveKind::Xz,
            Self::Zstd => ArchiveKind::Zstd,
        }
    }

    /// Returns a human-readable name for this codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.kind().name()
    }

    /// Plain extensions, stripped from the container name.
    const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Gzip => &[".gz", ".gzip"],
            Self::Bzip2 => &[".bz2", ".bzip2", ".bz"],
            Self::Xz => &[".xz"],
            Self::Zstd => &[".zst", ".zstd"],
        }
    }

    /// Tarball shorthands, replaced by `.tar`.
    const fn tar_shorthands(self) -> &'static [&'static str] {
        match self {
            Self::Gzip => &[".tgz", ".taz"],
            Self::Bzip2 => &[".tbz2", ".tbz", ".tb2"],
            Self::Xz => &[".txz"],
            Self::Zstd => &[".tzst", ".tzs"],
        }
    }

    /// Name of the decompressed entry inside a container called `name`.
    ///
    /// The codec extension is removed and tarball shorthands become `.tar`.
    /// An unknown extension is removed as well. A name without any extension
    /// is kept as is.
    #[must_use]
    pub fn inner_name(self, name: &str) -> String {
        let lower = name.to_ascii_lowercase();

        if let Some(ext) = self.tar_shorthands().iter().find(|ext| lower.ends_with(*ext)) {
            return format!("{}.tar", &name[..name.len() - ext.len()]);
        }
        if let Some(ext) = self.extensions().iter().find(|ext| lower.ends_with(*ext))
            && name.len() > ext.len()
        {
            return name[..name.len() - ext.len()].to_string();
        }
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name.to_string(),
        }
    }

    fn open<'r, R: Read + 'r>(self, reader: R) -> std::io::Result<Box<dyn Read + 'r>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

/// Decoder for a compressed single-stream container.
///
/// Yields one entry without a size hint, so its bytes are reserved chunk by
/// chunk while they are decompressed.
#[derive(Debug, Clone, Copy)]
pub struct StreamDecoder {
    codec: CompressionCodec,
}

impl StreamDecoder {
    /// Creates a decoder for `codec`.
    #[must_use]
    pub const fn new(codec: CompressionCodec) -> Self {
        Self { codec }
    }

    /// Returns the codec.
    #[must_use]
    pub const fn codec(&self) -> CompressionCodec {
        self.codec
    }
}

impl ArchiveDecoder for StreamDecoder {
    fn kind(&self) -> ArchiveKind {
        self.codec.kind()
    }

    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let path = container.path();
        let name = self.codec.inner_name(container.name());
        let mut reader = self
            .codec
            .open(container.reader())
            .map_err(|e| ExtractionError::decode(path, self.codec.kind(), e))?;

        visit(RawEntry {
            name,
            size_hint: None,
            reader: &mut reader,
        })
    }
}
