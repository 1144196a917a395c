//! In-memory or spilled entry content.

use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::io::{self};

/// Seekable bytes of one extracted entry or container.
///
/// Small entries stay in memory. Entries that outgrow the memory cutoff are
/// moved to an anonymous temporary file, which the OS removes when the value
/// is dropped.
///
/// # Examples
///
/// ```
/// use nestex_core::io::EntryContent;
/// use std::io::Read;
///
/// let mut content = EntryContent::from_vec(b"hello".to_vec());
/// assert_eq!(content.len(), 5);
///
/// let mut text = String::new();
/// content.read_to_string(&mut text)?;
/// assert_eq!(text, "hello");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub enum EntryContent {
    /// Bytes held in memory.
    Memory(Cursor<Vec<u8>>),
    /// Bytes spilled to a temporary file.
    File {
        /// Anonymous temporary file.
        file: File,
        /// Length of the content in bytes.
        len: u64,
    },
}

impl EntryContent {
    /// Wraps an in-memory buffer.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(bytes))
    }

    /// Wraps an open file, positioned at its start.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read or the file
    /// cannot be rewound.
    pub fn from_file(mut file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        file.seek(SeekFrom::Start(0))?;
        Ok(Self::File { file, len })
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Memory(cursor) => cursor.get_ref().len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    /// Returns `true` if the content has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the bytes are held in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    /// Moves the read position back to the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file cannot seek.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Reads the whole content into a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if spilled content cannot be read back.
    pub fn into_vec(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Memory(cursor) => Ok(cursor.into_inner()),
            Self::File { mut file, len } => {
                file.seek(SeekFrom::Start(0))?;
                let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

impl Default for EntryContent {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl Read for EntryContent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File { file, .. } => file.read(buf),
        }
    }
}

impl Seek for EntryContent {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File { file, .. } => file.seek(pos),
        }
    }
}

/// Writer that buffers in memory and spills to a temporary file once the
/// buffered size would exceed `cutoff`.
#[derive(Debug)]
pub struct ContentWriter {
    cutoff: u64,
    len: u64,
    sink: Sink,
}

#[derive(Debug)]
enum Sink {
    Memory(Vec<u8>),
    File(File),
}

impl ContentWriter {
    /// Creates a writer that spills after `cutoff` bytes.
    ///
    /// `size_hint` pre-sizes the in-memory buffer when it fits under the
    /// cutoff.
    #[must_use]
    pub fn new(cutoff: u64, size_hint: Option<u64>) -> Self {
        let capacity = size_hint
            .filter(|&hint| hint <= cutoff)
            .and_then(|hint| usize::try_from(hint).ok())
            .unwrap_or(0);
        Self {
            cutoff,
            len: 0,
            sink: Sink::Memory(Vec::with_capacity(capacity)),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the writer has moved to a temporary file.
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        matches!(self.sink, Sink::File(_))
    }

    /// Finishes writing and returns the content, positioned at its start.
    ///
    /// # Errors
    ///
    /// Returns an error if spilled content cannot be flushed or rewound.
    pub fn finish(self) -> io::Result<EntryContent> {
        match self.sink {
            Sink::Memory(bytes) => Ok(EntryContent::from_vec(bytes)),
            Sink::File(mut file) => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))?;
                Ok(EntryContent::File {
                    file,
                    len: self.len,
                })
            }
        }
    }

    fn spill(&mut self) -> io::Result<()> {
        if let Sink::Memory(bytes) = &self.sink {
            let mut file = tempfile::tempfile()?;
            file.write_all(bytes)?;
            tracing::trace!(bytes = bytes.len(), "spilling entry content to disk");
            self.sink = Sink::File(file);
        }
        Ok(())
    }
}

impl Write for ContentWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let next = self.len.saturating_add(buf.len() as u64);
        if next > self.cutoff && !self.is_spilled() {
            self.spill()?;
        }
        let written = match &mut self.sink {
            Sink::Memory(bytes) => {
                bytes.extend_from_slice(buf);
                buf.len()
            }
            Sink::File(file) => file.write(buf)?,
        };
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Memory(_) => Ok(()),
            Sink::File(file) => file.flush(),
        }
    }
}
