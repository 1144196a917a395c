//! Container format detection.
//!
//! Detection sniffs magic bytes first and falls back to the entry name only
//! for tar, which has no signature at offset 0.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::Result;
use crate::io::EntryContent;

/// Bytes needed to see the `ustar` marker at offset 257.
const SNIFF_LEN: usize = 512;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const SEVENZ_MAGIC: &[u8] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
const USTAR_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";

/// Format of a byte stream as far as the extractor is concerned.
///
/// Every kind except `Raw` is a container the extractor may decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// ZIP archive.
    Zip,
    /// Tar archive (uncompressed).
    Tar,
    /// Gzip stream.
    Gzip,
    /// Bzip2 stream.
    Bzip2,
    /// XZ stream.
    Xz,
    /// Zstandard stream.
    Zstd,
    /// 7z archive.
    SevenZip,
    /// Anything else. Always a leaf.
    Raw,
}

impl ArchiveKind {
    /// Returns `true` for every kind except `Raw`.
    #[must_use]
    pub const fn is_container(self) -> bool {
        !matches!(self, Self::Raw)
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::SevenZip => "7z",
            Self::Raw => "raw",
        }
    }

    /// Identifies a format from the leading bytes of a stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestex_core::formats::ArchiveKind;
    ///
    /// assert_eq!(ArchiveKind::sniff(b"PK\x03\x04rest"), ArchiveKind::Zip);
    /// assert_eq!(ArchiveKind::sniff(&[0x1F, 0x8B, 0x08]), ArchiveKind::Gzip);
    /// assert_eq!(ArchiveKind::sniff(b"plain text"), ArchiveKind::Raw);
    /// ```
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(ZIP_MAGIC) || head.starts_with(ZIP_EMPTY_MAGIC) {
            Self::Zip
        } else if head.starts_with(SEVENZ_MAGIC) {
            Self::SevenZip
        } else if head.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if head.starts_with(XZ_MAGIC) {
            Self::Xz
        } else if head.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else if head.starts_with(BZIP2_MAGIC) {
            Self::Bzip2
        } else if head
            .get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len())
            .is_some_and(|magic| magic == USTAR_MAGIC)
        {
            Self::Tar
        } else {
            Self::Raw
        }
    }

    /// Identifies a format from an entry name.
    ///
    /// Only tar is recognized here. Old v7 tar headers carry no magic, so a
    /// `.tar` name is the only hint.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar") {
            Self::Tar
        } else {
            Self::Raw
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the format of `content`, using `name` as a fallback hint.
///
/// The read position is restored to the start before returning.
///
/// # Errors
///
/// Returns an I/O error if the content cannot be read or rewound.
pub fn detect(content: &mut EntryContent, name: &str) -> Result<ArchiveKind> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    content.seek(SeekFrom::Start(0))?;
    content.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    content.seek(SeekFrom::Start(0))?;

    let kind = ArchiveKind::sniff(&head);
    if kind.is_container() {
        return Ok(kind);
    }
    Ok(ArchiveKind::from_name(name))
}
