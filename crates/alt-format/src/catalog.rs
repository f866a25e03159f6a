//! Section catalogue: walk a container's markers without decoding payloads.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use alt_common::constants::{END_MARKER_LEN, SECTION_HEADER_LEN};

use crate::container::{MagicFile, Mode, SectionKind};
use crate::error::Result;

/// Where one section sits in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionEntry {
    pub kind: SectionKind,
    /// Offset of the 16-byte section header.
    pub offset: u64,
    /// Payload length as declared in the header.
    pub length: u64,
}

/// Result of [`scan`]: the StartMarker values and every section in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub version: i32,
    pub alignment: i32,
    pub sections: Vec<SectionEntry>,
    /// Offset of the end sentinel.
    pub end_offset: u64,
}

impl Catalog {
    pub fn find(&self, kind: SectionKind) -> Option<&SectionEntry> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Total bytes the file occupies, end sentinel included.
    pub fn file_len(&self) -> u64 {
        self.end_offset + END_MARKER_LEN
    }
}

/// Open `path` and list its sections.
pub fn scan(path: impl AsRef<Path>) -> Result<Catalog> {
    let mut magic = MagicFile::<File>::open(path, Mode::Read)?;
    scan_stream(&mut magic)
}

/// List the sections of an already-open read handle positioned at offset 0.
///
/// Fails the same way a full read would on a bad StartMarker, an unknown
/// section kind, a missing end sentinel, or trailing bytes.
pub fn scan_stream<S: Read + Write + Seek>(magic: &mut MagicFile<S>) -> Result<Catalog> {
    let start = magic.read_start_marker()?;
    let mut sections = Vec::new();
    while !magic.at_end_marker()? {
        let marker = magic.read_section_marker()?;
        let offset = magic.position()? - SECTION_HEADER_LEN;
        magic.skip(marker.length)?;
        sections.push(SectionEntry { kind: marker.kind, offset, length: marker.length });
    }
    let end_offset = magic.position()?;
    magic.read_end_marker()?;
    debug!(sections = sections.len(), end_offset, "scanned container");
    Ok(Catalog { version: start.version, alignment: start.alignment, sections, end_offset })
}
