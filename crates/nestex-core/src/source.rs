//! Root input of an extraction run.

use std::fs::File;
use std::io::Read;
use std::io::{self};
use std::path::Path;

use crate::Result;
use crate::formats::ArchiveKind;
use crate::io::ContentWriter;
use crate::io::EntryContent;

/// The root stream of a run, with the name and size the budget is based on.
///
/// # Examples
///
/// ```
/// use nestex_core::ExtractionSource;
///
/// let source = ExtractionSource::from_bytes("upload.bin", vec![0u8; 10]);
/// assert_eq!(source.name(), "upload.bin");
/// assert_eq!(source.declared_size(), 10);
/// ```
#[derive(Debug)]
pub struct ExtractionSource {
    name: String,
    content: EntryContent,
    declared_size: u64,
    kind: Option<ArchiveKind>,
}

impl ExtractionSource {
    /// Wraps an in-memory buffer. The declared size is the buffer length.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::from_content(name, EntryContent::from_vec(bytes))
    }

    /// Wraps existing content. The declared size is the content length.
    #[must_use]
    pub fn from_content(name: impl Into<String>, content: EntryContent) -> Self {
        let declared_size = content.len();
        Self {
            name: name.into(),
            content,
            declared_size,
            kind: None,
        }
    }

    /// Reads `reader` to the end, spilling to a temporary file past
    /// `memory_cutoff` bytes. The declared size is the number of bytes read.
    ///
    /// The root input is not charged against the budget.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or spilling fails.
    pub fn from_reader(
        name: impl Into<String>,
        mut reader: impl Read,
        memory_cutoff: u64,
    ) -> Result<Self> {
        let mut writer = ContentWriter::new(memory_cutoff, None);
        io::copy(&mut reader, &mut writer)?;
        Ok(Self::from_content(name, writer.finish()?))
    }

    /// Opens a file. The name is the file name and the declared size is the
    /// file length.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned();
        Ok(Self::from_content(name, EntryContent::from_file(file)?))
    }

    /// Skips detection and decodes the root as `kind`.
    #[must_use]
    pub fn with_kind(mut self, kind: ArchiveKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Overrides the size the ratio cap is based on.
    #[must_use]
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    /// Root name, used as the first segment of every logical path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size the ratio cap is based on.
    #[must_use]
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Forced format, if any.
    #[must_use]
    pub fn kind(&self) -> Option<ArchiveKind> {
        self.kind
    }

    pub(crate) fn into_parts(self) -> (String, EntryContent, u64, Option<ArchiveKind>) {
        (self.name, self.content, self.declared_size, self.kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_reader_spills() {
        let source = ExtractionSource::from_reader("big", &[9u8; 64][..], 16).unwrap();
        assert_eq!(source.declared_size(), 64);
        let (_, content, _, kind) = source.into_parts();
        assert!(!content.is_in_memory());
        assert_eq!(kind, None);
    }

    #[test]
    fn test_open_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"12345")
            .unwrap();

        let source = ExtractionSource::open(&path).unwrap();
        assert_eq!(source.name(), "bundle.zip");
        assert_eq!(source.declared_size(), 5);
    }

    #[test]
    fn test_open_missing_file() {
        let err = ExtractionSource::open("/nonexistent/archive.zip").unwrap_err();
        assert!(matches!(err, crate::ExtractionError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let source = ExtractionSource::from_bytes("x", vec![1, 2, 3])
            .with_kind(ArchiveKind::Tar)
            .with_declared_size(100);
        assert_eq!(source.kind(), Some(ArchiveKind::Tar));
        assert_eq!(source.declared_size(), 100);
    }
}
