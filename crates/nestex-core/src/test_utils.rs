//! Test utilities for building nested archives in memory.
//!
//! Shared by unit tests, integration tests, benchmarks and the CLI tests.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use crate::ExtractionError;
use crate::Result;
use crate::formats::ArchiveDecoder;
use crate::formats::ArchiveKind;
use crate::formats::Container;
use crate::formats::EntryVisitor;
use crate::formats::RawEntry;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are created with mode 0o644.
///
/// # Examples
///
/// ```
/// use nestex_core::test_utils::create_test_tar;
///
/// let tar_data = create_test_tar(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut ar = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        ar.append_data(&mut header, path, data).unwrap();
    }
    ar.into_inner().unwrap()
}

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed.
///
/// # Examples
///
/// ```
/// use nestex_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    create_zip_with(entries, zip::CompressionMethod::Stored)
}

/// Creates an in-memory ZIP archive with deflate-compressed entries.
#[must_use]
pub fn create_deflated_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    create_zip_with(entries, zip::CompressionMethod::Deflated)
}

fn create_zip_with(entries: Vec<(&str, &[u8])>, method: zip::CompressionMethod) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    for (path, data) in entries {
        zip.start_file(path, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Gzip-compresses `data`.
#[must_use]
pub fn create_test_gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Bzip2-compresses `data`.
#[must_use]
pub fn create_test_bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Xz-compresses `data`.
#[must_use]
pub fn create_test_xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Zstd-compresses `data`.
#[must_use]
pub fn create_test_zstd(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 3).unwrap()
}

/// Creates a one-file TAR archive whose header checksum is wrong.
///
/// The `ustar` magic is intact, so the archive is still detected as tar.
#[must_use]
pub fn create_corrupt_tar() -> Vec<u8> {
    let mut data = create_test_tar(vec![("file.txt", b"payload")]);
    // Header checksum field: 8 bytes at offset 148
    data[148..156].copy_from_slice(b"0000000\0");
    data
}

/// Builder for creating TAR test archives with various entry types.
///
/// # Examples
///
/// ```
/// use nestex_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .add_symlink("link", "file.txt")
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a symlink to the archive.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct ScriptedEntry {
    name: String,
    data: Vec<u8>,
    size_hint: Option<u64>,
}

/// Decoder that ignores the container bytes and plays back a fixed list of
/// entries.
///
/// Lets tests pin exact sizes that real formats cannot produce, such as a
/// 5-byte container holding a 10-byte file.
///
/// # Examples
///
/// ```
/// use nestex_core::formats::{ArchiveKind, DecoderRegistry};
/// use nestex_core::test_utils::ScriptedDecoder;
/// use nestex_core::{ExtractionSource, Extractor, ExtractorOptions};
///
/// let decoder = ScriptedDecoder::new(ArchiveKind::Zip).entry("big.bin", vec![0u8; 10]);
/// let extractor = Extractor::new(ExtractorOptions::default().with_max_extracted_bytes_ratio(1.0))?
///     .with_decoders(DecoderRegistry::empty().with(decoder));
///
/// let source = ExtractionSource::from_bytes("tiny.zip", vec![0u8; 5]).with_kind(ArchiveKind::Zip);
/// assert!(extractor.extract_all(source).is_err());
/// # Ok::<(), nestex_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    kind: ArchiveKind,
    entries: Vec<ScriptedEntry>,
    fail_after: Option<usize>,
}

impl ScriptedDecoder {
    /// Creates a decoder registered for `kind` with no entries.
    #[must_use]
    pub fn new(kind: ArchiveKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            fail_after: None,
        }
    }

    /// Adds an entry whose exact size is announced as the size hint.
    #[must_use]
    pub fn entry(mut self, name: &str, data: Vec<u8>) -> Self {
        let size_hint = Some(data.len() as u64);
        self.entries.push(ScriptedEntry {
            name: name.to_string(),
            data,
            size_hint,
        });
        self
    }

    /// Adds an entry without a size hint.
    #[must_use]
    pub fn entry_without_hint(mut self, name: &str, data: Vec<u8>) -> Self {
        self.entries.push(ScriptedEntry {
            name: name.to_string(),
            data,
            size_hint: None,
        });
        self
    }

    /// Fails with a decode error after `count` entries were visited.
    #[must_use]
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

impl ArchiveDecoder for ScriptedDecoder {
    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            if self.fail_after == Some(index) {
                return Err(ExtractionError::decode(
                    container.path(),
                    self.kind,
                    "scripted failure",
                ));
            }
            let mut reader = entry.data.as_slice();
            visit(RawEntry {
                name: entry.name.clone(),
                size_hint: entry.size_hint,
                reader: &mut reader,
            })?;
        }
        if self.fail_after.is_some_and(|count| count >= self.entries.len()) {
            return Err(ExtractionError::decode(
                container.path(),
                self.kind,
                "scripted failure",
            ));
        }
        Ok(())
    }
}
