//! Decoder contract.

use std::io::Read;

use crate::Result;
use crate::io::EntryContent;

use super::detect::ArchiveKind;

/// A container handed to a decoder.
#[derive(Debug)]
pub struct Container<'a> {
    path: &'a str,
    kind: ArchiveKind,
    content: &'a mut EntryContent,
}

impl<'a> Container<'a> {
    /// Wraps `content`, rewound to its start.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the content cannot be rewound.
    pub fn new(path: &'a str, kind: ArchiveKind, content: &'a mut EntryContent) -> Result<Self> {
        content.rewind()?;
        Ok(Self {
            path,
            kind,
            content,
        })
    }

    /// Logical path of the container.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Last segment of the logical path.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }

    /// Detected format.
    #[must_use]
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Total size of the container bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.content.len()
    }

    /// Returns `true` if the container has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Seekable access to the container bytes.
    pub fn reader(&mut self) -> &mut EntryContent {
        self.content
    }
}

/// One file entry produced by a decoder.
pub struct RawEntry<'r> {
    /// Entry name inside its container.
    pub name: String,
    /// Decompressed size, if the format records it.
    pub size_hint: Option<u64>,
    /// Decompressed bytes of the entry.
    pub reader: &'r mut dyn Read,
}

impl std::fmt::Debug for RawEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEntry")
            .field("name", &self.name)
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

/// Visitor a decoder calls once per file entry.
pub type EntryVisitor<'v> = dyn FnMut(RawEntry<'_>) -> Result<()> + 'v;

/// Decoder for one container format.
///
/// A decoder lists the file entries of a container in archive order and hands
/// each one to `visit` as a stream. It never decides whether an entry is
/// itself a container and never touches the run budget; the extractor does
/// both from the entry stream.
///
/// An error returned by `visit` must be passed through unchanged, and the
/// decoder must stop at the first such error. Any other failure is reported
/// as `DecodeFailure` for the container.
///
/// # Examples
///
/// ```
/// use nestex_core::Result;
/// use nestex_core::formats::{ArchiveDecoder, ArchiveKind, Container, EntryVisitor, RawEntry};
///
/// /// Treats the whole container as one entry.
/// struct Passthrough;
///
/// impl ArchiveDecoder for Passthrough {
///     fn kind(&self) -> ArchiveKind {
///         ArchiveKind::Gzip
///     }
///
///     fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
///         let name = format!("{}.out", container.name());
///         let size_hint = Some(container.len());
///         visit(RawEntry { name, size_hint, reader: container.reader() })
///     }
/// }
/// ```
pub trait ArchiveDecoder: Send + Sync {
    /// Format this decoder handles.
    fn kind(&self) -> ArchiveKind;

    /// Calls `visit` for each file entry of `container`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the container is malformed, or the first
    /// error returned by `visit`.
    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()>;
}
