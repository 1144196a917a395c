//! 7z decoder.
//!
//! Uses the callback API of `sevenz-rust2`, which hands each entry to a
//! closure together with a reader over its decompressed bytes. Encrypted
//! archives fail to open with an empty password and are reported as decode
//! failures.

use std::io::Read;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;

use super::detect::ArchiveKind;
use super::traits::ArchiveDecoder;
use super::traits::Container;
use super::traits::EntryVisitor;
use super::traits::RawEntry;

/// Decodes 7z archives in header order.
///
/// Directory entries are skipped. Solid archives are decoded as a whole
/// stream, one entry after another.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipDecoder;

impl ArchiveDecoder for SevenZipDecoder {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let path = container.path();
        // The library only carries its own error type through the callback,
        // so a visitor error is parked here and restored afterwards
        let mut stopped: Option<ExtractionError> = None;

        let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                          reader: &mut dyn Read,
                          _dest: &PathBuf|
         -> std::result::Result<bool, sevenz_rust2::Error> {
            if entry.is_directory() {
                return Ok(true);
            }
            let raw = RawEntry {
                name: entry.name.clone(),
                size_hint: Some(entry.size),
                reader,
            };
            match visit(raw) {
                Ok(()) => Ok(true),
                Err(err) => {
                    stopped = Some(err);
                    Err(sevenz_rust2::Error::Other("entry visitor stopped".into()))
                }
            }
        };

        let result =
            sevenz_rust2::decompress_with_extract_fn(container.reader(), PathBuf::new(), extract_fn);

        if let Some(err) = stopped {
            return Err(err);
        }
        result.map_err(|e| ExtractionError::decode(path, ArchiveKind::SevenZip, e))
    }
}
