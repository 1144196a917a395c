//! Tar decoder.

use tar::Archive;
use tar::EntryType;

use crate::ExtractionError;
use crate::Result;

use super::detect::ArchiveKind;
use super::traits::ArchiveDecoder;
use super::traits::Container;
use super::traits::EntryVisitor;
use super::traits::RawEntry;

/// Decodes uncompressed tar archives in stream order.
///
/// Only regular file entries are visited. Directories, links and device
/// nodes carry no content and are skipped. Compressed tarballs reach this
/// decoder after their codec layer was decoded as a separate container.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarDecoder;

impl ArchiveDecoder for TarDecoder {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Tar
    }

    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let path = container.path();
        let mut archive = Archive::new(container.reader());
        let entries = archive
            .entries()
            .map_err(|e| ExtractionError::decode(path, ArchiveKind::Tar, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| ExtractionError::decode(path, ArchiveKind::Tar, e))?;

            let entry_type = entry.header().entry_type();
            if !matches!(
                entry_type,
                EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse
            ) {
                tracing::trace!(container = path, ?entry_type, "skipping non-file tar entry");
                continue;
            }

            let name = entry
                .path()
                .map_err(|e| ExtractionError::decode(path, ArchiveKind::Tar, e))?
                .to_string_lossy()
                .into_owned();
            let size_hint = Some(entry.size());

            visit(RawEntry {
                name,
                size_hint,
                reader: &mut entry,
            })?;
        }

        Ok(())
    }
}
