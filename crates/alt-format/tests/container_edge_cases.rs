//! Edge-case tests for the ALT container handle.
//!
//! Tests cover:
//! - Minimal and multi-section files written to disk and read back
//! - StartMarker checks in order: identity, declared size, version, alignment
//! - End sentinel mismatch, truncation, and trailing bytes
//! - Unknown section kinds
//! - Catalogue scan offsets and lengths
//! - Open failures and validate() rewinding

use std::io::Cursor;

use alt_format::field::string_len;
use alt_format::{ErrorKind, FormatError, MagicFile, Mode, SectionKind, scan, scan_stream};
use tempfile::TempDir;

/// Start marker, a General section holding one string, a Tensors section
/// holding one i32, then the end sentinel.
fn sample_container(alignment: i32) -> Vec<u8> {
    let mut w = MagicFile::from_stream(Cursor::new(Vec::new()), Mode::Write);
    w.write_start_marker(2, alignment).unwrap();
    w.write_section_marker(SectionKind::General, string_len("mistral")).unwrap();
    w.write_string_field("mistral").unwrap();
    w.write_section_marker(SectionKind::Tensors, 4).unwrap();
    w.write_i32_field(0).unwrap();
    w.write_end_marker().unwrap();
    w.into_inner().into_inner()
}

fn read_all(bytes: Vec<u8>) -> Result<(String, i32), FormatError> {
    let mut r = MagicFile::from_stream(Cursor::new(bytes), Mode::Read);
    r.read_start_marker()?;
    r.expect_section(SectionKind::General)?;
    let name = r.read_string_field()?;
    r.expect_section(SectionKind::Tensors)?;
    let count = r.read_i32_field()?;
    r.read_end_marker()?;
    Ok((name, count))
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn minimal_file_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.alt");

    let mut w = MagicFile::open(&path, Mode::Write).unwrap();
    w.write_start_marker(2, 32).unwrap();
    w.write_end_marker().unwrap();
    w.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 36);
    assert_eq!(&bytes[32..], &0x0FFF_FFFFu32.to_le_bytes());

    let mut r = MagicFile::open(&path, Mode::Read).unwrap();
    r.validate().unwrap();
    assert_eq!(r.position().unwrap(), 0, "validate rewinds");
    let start = r.read_start_marker().unwrap();
    assert_eq!((start.version, start.alignment), (2, 32));
    r.read_end_marker().unwrap();
    r.close().unwrap();
}

#[test]
fn sample_layout_with_default_alignment() {
    let bytes = sample_container(32);
    // 24+8 | 16+11+5 | 16+4+12 | 4
    assert_eq!(bytes.len(), 100);
    assert_eq!(&bytes[32..40], &0xCAFE_BABEu64.to_le_bytes());
    assert_eq!(&bytes[40..48], &11u64.to_le_bytes());
    assert_eq!(&bytes[64..72], &0xFACE_FEEDu64.to_le_bytes());

    let (name, count) = read_all(bytes).unwrap();
    assert_eq!(name, "mistral");
    assert_eq!(count, 0);
}

#[test]
fn alignment_is_taken_from_start_marker() {
    for alignment in [8, 16, 64, 4096] {
        let bytes = sample_container(alignment);
        let (name, _) = read_all(bytes).unwrap();
        assert_eq!(name, "mistral", "alignment {alignment}");
    }
}

#[test]
fn open_with_mode_strings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.alt");
    let w = MagicFile::open_with(&path, "wb").unwrap();
    assert_eq!(w.mode(), Mode::Write);
    w.close().unwrap();

    let err = MagicFile::open_with(&path, "r+").unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedMode(ref m) if m == "r+"));
    assert_eq!(err.kind(), ErrorKind::File);
}

// ---------------------------------------------------------------------------
// StartMarker validation
// ---------------------------------------------------------------------------

#[test]
fn flipped_identity_byte_is_invalid_marker() {
    let mut bytes = sample_container(32);
    bytes[0] ^= 0xFF;
    let err = read_all(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMarker);
}

#[test]
fn foreign_file_rejected_on_identity_alone() {
    // Shorter than a full StartMarker, but the identity is already wrong.
    let mut r = MagicFile::from_stream(Cursor::new(b"GGUF\x03\0\0\0\0\0".to_vec()), Mode::Read);
    let err = r.validate().unwrap_err();
    assert!(matches!(err, FormatError::InvalidMarker { what: "start", .. }));
}

#[test]
fn declared_size_must_be_24() {
    let mut bytes = sample_container(32);
    bytes[8..16].copy_from_slice(&8u64.to_le_bytes());
    let err = read_all(bytes).unwrap_err();
    assert!(matches!(err, FormatError::HeaderSize(8)));
    assert_eq!(err.kind(), ErrorKind::Error);
}

#[test]
fn version_three_rejected() {
    let mut bytes = sample_container(32);
    bytes[16..20].copy_from_slice(&3i32.to_le_bytes());
    let err = read_all(bytes).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedVersion(3)));
    assert_eq!(err.kind(), ErrorKind::Error);
}

#[test]
fn identity_checked_before_version() {
    let mut bytes = sample_container(32);
    // The identity's low byte is already zero; corrupt a byte that is not.
    assert_ne!(bytes[1], 0);
    bytes[1] = 0;
    bytes[16..20].copy_from_slice(&9i32.to_le_bytes());
    let err = read_all(bytes).unwrap_err();
    assert!(matches!(err, FormatError::InvalidMarker { what: "start", .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidMarker);
}

#[test]
fn unsupported_alignment_rejected() {
    let mut bytes = sample_container(32);
    bytes[20..24].copy_from_slice(&24i32.to_le_bytes());
    assert!(matches!(read_all(bytes), Err(FormatError::UnsupportedAlignment(24))));
}

// ---------------------------------------------------------------------------
// Sections and end sentinel
// ---------------------------------------------------------------------------

#[test]
fn unknown_section_kind() {
    let mut bytes = sample_container(32);
    bytes[32..40].copy_from_slice(&0x1234_5678u64.to_le_bytes());
    let err = read_all(bytes).unwrap_err();
    assert!(matches!(err, FormatError::UnknownSection(0x1234_5678)));
    assert_eq!(err.kind(), ErrorKind::InvalidMarker);
}

#[test]
fn corrupted_end_sentinel() {
    let mut bytes = sample_container(32);
    let n = bytes.len();
    bytes[n - 1] = 0xAA;
    let err = read_all(bytes).unwrap_err();
    assert!(matches!(err, FormatError::InvalidMarker { what: "end", .. }));
}

#[test]
fn truncated_before_end_sentinel_is_file_error() {
    let mut bytes = sample_container(32);
    bytes.truncate(bytes.len() - 2);
    let err = read_all(bytes).unwrap_err();
    assert!(err.is_eof());
    assert_eq!(err.kind(), ErrorKind::File);
}

#[test]
fn truncated_inside_string_is_file_error() {
    let mut bytes = sample_container(32);
    bytes.truncate(52);
    assert_eq!(read_all(bytes).unwrap_err().kind(), ErrorKind::File);
}

#[test]
fn trailing_bytes_after_end_sentinel() {
    let mut bytes = sample_container(32);
    bytes.extend_from_slice(&[0, 0, 0]);
    assert!(matches!(read_all(bytes), Err(FormatError::TrailingData(3))));
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[test]
fn scan_lists_sections_in_file_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.alt");
    std::fs::write(&path, sample_container(32)).unwrap();

    let catalog = scan(&path).unwrap();
    assert_eq!(catalog.version, 2);
    assert_eq!(catalog.alignment, 32);
    assert_eq!(catalog.sections.len(), 2);
    assert_eq!(catalog.sections[0].kind, SectionKind::General);
    assert_eq!(catalog.sections[0].offset, 32);
    assert_eq!(catalog.sections[0].length, 11);
    assert_eq!(catalog.sections[1].kind, SectionKind::Tensors);
    assert_eq!(catalog.sections[1].offset, 64);
    assert_eq!(catalog.end_offset, 96);
    assert_eq!(catalog.file_len(), 100);
    assert!(catalog.find(SectionKind::Tokenizer).is_none());
}

#[test]
fn scan_rejects_missing_end_sentinel() {
    let mut bytes = sample_container(32);
    bytes.truncate(96);
    let mut r = MagicFile::from_stream(Cursor::new(bytes), Mode::Read);
    assert_eq!(scan_stream(&mut r).unwrap_err().kind(), ErrorKind::File);
}

#[test]
fn open_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = MagicFile::open(dir.path().join("nope.alt"), Mode::Read).unwrap_err();
    assert!(matches!(err, FormatError::Open { .. }));
    assert_eq!(err.kind(), ErrorKind::File);
}
