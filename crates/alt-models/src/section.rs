//! The seam between typed sections and the container.

use std::io::{Read, Seek, Write};

use alt_format::{FormatError, MagicFile, SectionKind};
use tracing::{debug, error};

use crate::error::Result;

/// A typed section payload.
///
/// Implementors describe their payload; the provided methods frame it with a
/// section marker and check that the declared length matches what was
/// actually written or consumed.
pub trait Section: Sized {
    const KIND: SectionKind;

    /// Reject values that cannot be encoded. Runs before anything is written.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Exact payload size in bytes, excluding the 16-byte header and padding.
    fn encoded_len(&self) -> u64;

    fn write_payload<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()>;

    /// `length` is the declared payload size, for bounding allocations.
    fn read_payload<S: Read + Write + Seek>(magic: &mut MagicFile<S>, length: u64)
    -> Result<Self>;

    fn write_to<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        self.validate()?;
        let declared = self.encoded_len();
        magic.write_section_marker(Self::KIND, declared)?;
        let start = magic.position()?;
        self.write_payload(magic)?;
        let written = magic.position()? - start;
        check_length(Self::KIND, declared, written)?;
        debug!(kind = %Self::KIND, bytes = written, "wrote section");
        Ok(())
    }

    fn read_from<S: Read + Write + Seek>(magic: &mut MagicFile<S>) -> Result<Self> {
        let declared = magic.expect_section(Self::KIND)?;
        let start = magic.position()?;
        let section = Self::read_payload(magic, declared)?;
        let consumed = magic.position()? - start;
        check_length(Self::KIND, declared, consumed)?;
        debug!(kind = %Self::KIND, bytes = consumed, "read section");
        Ok(section)
    }
}

fn check_length(kind: SectionKind, declared: u64, consumed: u64) -> Result<()> {
    if declared != consumed {
        error!(%kind, declared, consumed, "section length mismatch");
        return Err(FormatError::SectionLength { kind, declared, consumed }.into());
    }
    Ok(())
}
