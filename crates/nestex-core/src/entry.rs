//! Extracted leaf entries.

use std::io::Read;

use crate::Result;
use crate::io::EntryContent;

/// A leaf handed to the consumer.
///
/// The consumer owns the entry and its content. Nothing in the extractor
/// keeps a handle to it after it was yielded.
#[derive(Debug)]
pub struct ExtractedEntry {
    path: String,
    content: EntryContent,
    length: u64,
    is_failed_container: bool,
}

impl ExtractedEntry {
    pub(crate) fn new(path: String, mut content: EntryContent, is_failed_container: bool) -> Result<Self> {
        content.rewind()?;
        let length = content.len();
        Ok(Self {
            path,
            content,
            length,
            is_failed_container,
        })
    }

    /// Logical path, outermost container first (`outer.zip/inner.tar/a.txt`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the logical path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Nesting segments of the logical path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }

    /// Decompressed length in bytes.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns `true` if this is a container that failed to decode, yielded
    /// with its raw bytes.
    #[must_use]
    pub fn is_failed_container(&self) -> bool {
        self.is_failed_container
    }

    /// Returns `true` if the content is held in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.content.is_in_memory()
    }

    /// Mutable access to the content stream.
    pub fn content_mut(&mut self) -> &mut EntryContent {
        &mut self.content
    }

    /// Consumes the entry and returns its content stream.
    #[must_use]
    pub fn into_content(self) -> EntryContent {
        self.content
    }

    /// Reads the full content from the start.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if spilled content cannot be read back.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        self.content.rewind()?;
        let mut bytes = Vec::with_capacity(usize::try_from(self.length).unwrap_or(0));
        self.content.read_to_end(&mut bytes)?;
        self.content.rewind()?;
        Ok(bytes)
    }
}
