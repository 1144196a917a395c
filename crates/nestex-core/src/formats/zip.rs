//! ZIP decoder.

use zip::ZipArchive;

use crate::ExtractionError;
use crate::Result;

use super::detect::ArchiveKind;
use super::traits::ArchiveDecoder;
use super::traits::Container;
use super::traits::EntryVisitor;
use super::traits::RawEntry;

/// Decodes ZIP archives in central directory order.
///
/// Directory entries are skipped. The uncompressed size recorded in the
/// central directory is passed on as the size hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipDecoder;

impl ArchiveDecoder for ZipDecoder {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn decode(&self, container: &mut Container<'_>, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let path = container.path();
        let mut archive = ZipArchive::new(container.reader())
            .map_err(|e| ExtractionError::decode(path, ArchiveKind::Zip, e))?;

        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| ExtractionError::decode(path, ArchiveKind::Zip, e))?;

            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let size_hint = Some(file.size());
            visit(RawEntry {
                name,
                size_hint,
                reader: &mut file,
            })?;
        }

        Ok(())
    }
}
