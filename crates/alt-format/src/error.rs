use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::container::{Mode, SectionKind};

/// Errors returned by container and field operations.
///
/// Every error is fatal for the handle that produced it: the stream position
/// is left wherever the failure happened and the caller must close the handle.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported open mode: {0:?}")]
    UnsupportedMode(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid {what} marker: expected {expected:#x}, found {found:#x}")]
    InvalidMarker { what: &'static str, expected: u64, found: u64 },
    #[error("unknown section kind {0:#x}")]
    UnknownSection(u64),
    #[error("unexpected section: expected {expected}, found {found}")]
    UnexpectedSection { expected: SectionKind, found: SectionKind },
    #[error("alignment failed at offset {offset}: {source}")]
    Alignment {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("invalid start marker size: declared {0}, expected 24")]
    HeaderSize(u64),
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(i32),
    #[error("unsupported alignment: {0}")]
    UnsupportedAlignment(i32),
    #[error("malformed field: {0}")]
    Malformed(String),
    #[error("{expected} operation on a handle opened for {actual}")]
    WrongMode { expected: Mode, actual: Mode },
    #[error("{0} trailing bytes after end marker")]
    TrailingData(u64),
    #[error("{kind} section declared {declared} bytes but {consumed} were consumed")]
    SectionLength { kind: SectionKind, declared: u64, consumed: u64 },
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The stream could not be opened, read, or written.
    File,
    /// Identity, section kind, or end sentinel did not match.
    InvalidMarker,
    /// Padding could not be written or skipped.
    Alignment,
    /// Anything else: version, declared size, malformed fields.
    Error,
}

impl FormatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } | Self::UnsupportedMode(_) | Self::Io(_) => ErrorKind::File,
            Self::InvalidMarker { .. }
            | Self::UnknownSection(_)
            | Self::UnexpectedSection { .. } => ErrorKind::InvalidMarker,
            Self::Alignment { .. } => ErrorKind::Alignment,
            Self::HeaderSize(_)
            | Self::UnsupportedVersion(_)
            | Self::UnsupportedAlignment(_)
            | Self::Malformed(_)
            | Self::WrongMode { .. }
            | Self::TrailingData(_)
            | Self::SectionLength { .. } => ErrorKind::Error,
        }
    }

    /// Shorthand for a short read: the stream ended inside a field.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
