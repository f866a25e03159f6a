//! The magic-file handle.
//!
//! A container is a StartMarker, then any number of sections (16-byte header
//! plus payload), then the 4-byte end sentinel. Every marker begins on an
//! offset that is a multiple of the handle's alignment; the gap is zero bytes
//! on write and skipped on read.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, error};

use alt_common::constants::{
    MAGIC_ALIGNMENT, MAGIC_ALT, MAGIC_END, MAGIC_GENERAL, MAGIC_PARAMETERS, MAGIC_TENSORS,
    MAGIC_TOKENIZER, MAGIC_VERSION, START_MARKER_LEN, is_supported_alignment,
};

use crate::error::{FormatError, Result};
use crate::field;

/// Direction a handle was opened for. Fixed at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Read,
    Write,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

impl FromStr for Mode {
    type Err = FormatError;

    /// Accepts the stdio spellings `rb`/`r` and `wb`/`w`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rb" | "r" => Ok(Self::Read),
            "wb" | "w" => Ok(Self::Write),
            other => Err(FormatError::UnsupportedMode(other.to_string())),
        }
    }
}

/// The four section kinds, each identified on disk by an 8-byte marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    General,
    Parameters,
    Tokenizer,
    Tensors,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] =
        [Self::General, Self::Parameters, Self::Tokenizer, Self::Tensors];

    pub const fn marker(self) -> u64 {
        match self {
            Self::General => MAGIC_GENERAL,
            Self::Parameters => MAGIC_PARAMETERS,
            Self::Tokenizer => MAGIC_TOKENIZER,
            Self::Tensors => MAGIC_TENSORS,
        }
    }

    pub const fn from_marker(marker: u64) -> Option<Self> {
        match marker {
            MAGIC_GENERAL => Some(Self::General),
            MAGIC_PARAMETERS => Some(Self::Parameters),
            MAGIC_TOKENIZER => Some(Self::Tokenizer),
            MAGIC_TENSORS => Some(Self::Tensors),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Parameters => "parameters",
            Self::Tokenizer => "tokenizer",
            Self::Tensors => "tensors",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded StartMarker. The identity and declared size are checked, not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartMarker {
    pub version: i32,
    pub alignment: i32,
}

/// Decoded section header. `length` counts payload bytes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionMarker {
    pub kind: SectionKind,
    pub length: u64,
}

/// Number of zero bytes needed to bring `offset` up to a multiple of `alignment`.
#[inline]
pub const fn padding_for(offset: u64, alignment: u64) -> u64 {
    (alignment - offset % alignment) % alignment
}

/// An open container stream plus its mode and current alignment.
///
/// The alignment starts at 32 and is replaced by whatever the StartMarker
/// carries once one has been written or read.
pub struct MagicFile<S = File> {
    path: PathBuf,
    mode: Mode,
    stream: S,
    alignment: u64,
}

impl<S> fmt::Debug for MagicFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagicFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("alignment", &self.alignment)
            .finish_non_exhaustive()
    }
}

impl MagicFile<File> {
    /// Open `path` for reading, or create/truncate it for writing.
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let path = path.as_ref();
        let opened = match mode {
            Mode::Read => File::open(path),
            Mode::Write => OpenOptions::new().write(true).create(true).truncate(true).open(path),
        };
        let stream = opened.map_err(|source| {
            error!(path = %path.display(), %mode, "failed to open container: {source}");
            FormatError::Open { path: path.to_path_buf(), source }
        })?;
        debug!(path = %path.display(), %mode, "opened container");
        Ok(Self { path: path.to_path_buf(), mode, stream, alignment: MAGIC_ALIGNMENT as u64 })
    }

    /// `open` with a stdio-style mode string.
    pub fn open_with(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let mode: Mode = mode.parse().inspect_err(|e| error!("{e}"))?;
        Self::open(path, mode)
    }
}

impl<S: Read + Write + Seek> MagicFile<S> {
    /// Wrap an already-open stream, e.g. an in-memory cursor.
    pub fn from_stream(stream: S, mode: Mode) -> Self {
        Self { path: PathBuf::from("<stream>"), mode, stream, alignment: MAGIC_ALIGNMENT as u64 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Flush pending writes and release the stream.
    pub fn close(mut self) -> Result<()> {
        if self.mode == Mode::Write {
            self.stream.flush().inspect_err(|e| {
                error!(path = %self.path.display(), "failed to flush container: {e}");
            })?;
        }
        debug!(path = %self.path.display(), "closed container");
        Ok(())
    }

    /// Give back the underlying stream without flushing.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Check the StartMarker, then rewind to offset 0 so a full read can follow.
    pub fn validate(&mut self) -> Result<()> {
        self.read_start_marker()?;
        self.stream.seek(SeekFrom::Start(0))?;
        debug!(path = %self.path.display(), "container validated");
        Ok(())
    }

    /// Advance to the next multiple of the alignment. Returns the bytes padded.
    ///
    /// Writes zeros in write mode and seeks forward in read mode.
    pub fn pad(&mut self) -> Result<u64> {
        let offset = self.stream.stream_position().map_err(|source| {
            error!(path = %self.path.display(), "failed to query offset for padding: {source}");
            FormatError::Alignment { offset: 0, source }
        })?;
        let needed = padding_for(offset, self.alignment);
        if needed == 0 {
            return Ok(0);
        }
        let result = match self.mode {
            Mode::Write => write_zeros(&mut self.stream, needed),
            Mode::Read => self.stream.seek(SeekFrom::Current(needed as i64)).map(|_| ()),
        };
        result.map_err(|source| {
            error!(path = %self.path.display(), offset, needed, "padding failed: {source}");
            FormatError::Alignment { offset, source }
        })?;
        Ok(needed)
    }

    // ── Markers ─────────────────────────────────────────────────────────

    /// Emit the 24-byte StartMarker and pad. Adopts `alignment` for the rest of the file.
    pub fn write_start_marker(&mut self, version: i32, alignment: i32) -> Result<()> {
        self.require(Mode::Write)?;
        if version != MAGIC_VERSION {
            error!(version, "refusing to write unsupported version");
            return Err(FormatError::UnsupportedVersion(version));
        }
        if !is_supported_alignment(alignment) {
            error!(alignment, "refusing to write unsupported alignment");
            return Err(FormatError::UnsupportedAlignment(alignment));
        }

        let mut buf = Vec::with_capacity(START_MARKER_LEN as usize);
        field::write_u64(&mut buf, MAGIC_ALT)?;
        field::write_u64(&mut buf, START_MARKER_LEN)?;
        field::write_i32(&mut buf, version)?;
        field::write_i32(&mut buf, alignment)?;
        self.stream.write_all(&buf).inspect_err(|e| {
            error!(path = %self.path.display(), "failed to write start marker: {e}");
        })?;

        self.alignment = alignment as u64;
        self.pad()?;
        debug!(version, alignment, "wrote start marker");
        Ok(())
    }

    /// Read and check the StartMarker, then pad.
    ///
    /// Checks run in order: identity, declared size, version, alignment. Each
    /// field is read only once the previous one has passed.
    pub fn read_start_marker(&mut self) -> Result<StartMarker> {
        self.require(Mode::Read)?;

        let identity = self.read_u64_logged("start marker identity")?;
        if identity != MAGIC_ALT {
            error!(path = %self.path.display(), "not an ALT container: identity {identity:#x}");
            return Err(FormatError::InvalidMarker { what: "start", expected: MAGIC_ALT, found: identity });
        }

        let size = self.read_u64_logged("start marker size")?;
        if size != START_MARKER_LEN {
            error!(size, "start marker declares the wrong size");
            return Err(FormatError::HeaderSize(size));
        }

        let version = self.read_i32_logged("format version")?;
        if version != MAGIC_VERSION {
            error!(version, "unsupported format version");
            return Err(FormatError::UnsupportedVersion(version));
        }

        let alignment = self.read_i32_logged("alignment")?;
        if !is_supported_alignment(alignment) {
            error!(alignment, "unsupported alignment");
            return Err(FormatError::UnsupportedAlignment(alignment));
        }

        self.alignment = alignment as u64;
        self.pad()?;
        debug!(version, alignment, "read start marker");
        Ok(StartMarker { version, alignment })
    }

    /// Pad, then emit a section header announcing `length` payload bytes.
    pub fn write_section_marker(&mut self, kind: SectionKind, length: u64) -> Result<()> {
        self.require(Mode::Write)?;
        self.pad()?;
        let mut buf = Vec::with_capacity(16);
        field::write_u64(&mut buf, kind.marker())?;
        field::write_u64(&mut buf, length)?;
        self.stream.write_all(&buf).inspect_err(|e| {
            error!(%kind, "failed to write section marker: {e}");
        })?;
        debug!(%kind, length, "wrote section marker");
        Ok(())
    }

    /// Pad, then read a section header. Unknown kinds are an invalid marker.
    pub fn read_section_marker(&mut self) -> Result<SectionMarker> {
        self.require(Mode::Read)?;
        self.pad()?;
        let raw = self.read_u64_logged("section kind")?;
        let Some(kind) = SectionKind::from_marker(raw) else {
            error!("unknown section marker {raw:#x}");
            return Err(FormatError::UnknownSection(raw));
        };
        let length = self.read_u64_logged("section length")?;
        debug!(%kind, length, "read section marker");
        Ok(SectionMarker { kind, length })
    }

    /// Read a section header and require it to be `expected`. Returns the payload length.
    pub fn expect_section(&mut self, expected: SectionKind) -> Result<u64> {
        let marker = self.read_section_marker()?;
        if marker.kind != expected {
            error!(%expected, found = %marker.kind, "sections out of order");
            return Err(FormatError::UnexpectedSection { expected, found: marker.kind });
        }
        Ok(marker.length)
    }

    /// Seek past `length` payload bytes without decoding them.
    pub fn skip(&mut self, length: u64) -> Result<()> {
        self.require(Mode::Read)?;
        let delta = i64::try_from(length)
            .map_err(|_| FormatError::Malformed(format!("section length {length} too large")))?;
        self.stream.seek(SeekFrom::Current(delta))?;
        Ok(())
    }

    /// Pad, then emit the 4-byte end sentinel.
    pub fn write_end_marker(&mut self) -> Result<()> {
        self.require(Mode::Write)?;
        self.pad()?;
        field::write_u32(&mut self.stream, MAGIC_END).inspect_err(|e| {
            error!(path = %self.path.display(), "failed to write end marker: {e}");
        })?;
        debug!("wrote end marker");
        Ok(())
    }

    /// Pad, read the end sentinel, and require that nothing follows it.
    pub fn read_end_marker(&mut self) -> Result<()> {
        self.require(Mode::Read)?;
        self.pad()?;
        let found = field::read_u32(&mut self.stream).inspect_err(|e| {
            error!(path = %self.path.display(), "failed to read end marker: {e}");
        })?;
        if found != MAGIC_END {
            error!("bad end marker {found:#x}");
            return Err(FormatError::InvalidMarker {
                what: "end",
                expected: u64::from(MAGIC_END),
                found: u64::from(found),
            });
        }

        let here = self.stream.stream_position()?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        if end > here {
            error!(trailing = end - here, "data after end marker");
            return Err(FormatError::TrailingData(end - here));
        }
        debug!("read end marker");
        Ok(())
    }

    /// Pad, then peek: `true` if the end sentinel comes next.
    ///
    /// The stream is left at the padded offset either way, so a following
    /// `read_section_marker` or `read_end_marker` starts in the right place.
    pub fn at_end_marker(&mut self) -> Result<bool> {
        self.require(Mode::Read)?;
        self.pad()?;
        let here = self.stream.stream_position()?;
        let mut buf = [0u8; 4];
        let found = match self.stream.read_exact(&mut buf) {
            Ok(()) => u32::from_le_bytes(buf) == MAGIC_END,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(e) => return Err(e.into()),
        };
        self.stream.seek(SeekFrom::Start(here))?;
        Ok(found)
    }

    // ── Fields ──────────────────────────────────────────────────────────

    pub fn write_bool_field(&mut self, value: bool) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_bool(&mut self.stream, value).inspect_err(|e| log_field_error("bool", e))
    }

    pub fn read_bool_field(&mut self) -> Result<bool> {
        self.require(Mode::Read)?;
        field::read_bool(&mut self.stream).inspect_err(|e| log_field_error("bool", e))
    }

    pub fn write_i32_field(&mut self, value: i32) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_i32(&mut self.stream, value).inspect_err(|e| log_field_error("i32", e))
    }

    pub fn read_i32_field(&mut self) -> Result<i32> {
        self.require(Mode::Read)?;
        field::read_i32(&mut self.stream).inspect_err(|e| log_field_error("i32", e))
    }

    pub fn write_f32_field(&mut self, value: f32) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_f32(&mut self.stream, value).inspect_err(|e| log_field_error("f32", e))
    }

    pub fn read_f32_field(&mut self) -> Result<f32> {
        self.require(Mode::Read)?;
        field::read_f32(&mut self.stream).inspect_err(|e| log_field_error("f32", e))
    }

    pub fn write_i64_field(&mut self, value: i64) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_i64(&mut self.stream, value).inspect_err(|e| log_field_error("i64", e))
    }

    pub fn read_i64_field(&mut self) -> Result<i64> {
        self.require(Mode::Read)?;
        field::read_i64(&mut self.stream).inspect_err(|e| log_field_error("i64", e))
    }

    pub fn write_string_field(&mut self, value: &str) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_string(&mut self.stream, value).inspect_err(|e| log_field_error("string", e))
    }

    pub fn read_string_field(&mut self) -> Result<String> {
        self.require(Mode::Read)?;
        field::read_string(&mut self.stream).inspect_err(|e| log_field_error("string", e))
    }

    pub fn write_bytes_field(&mut self, bytes: &[u8]) -> Result<()> {
        self.require(Mode::Write)?;
        field::write_bytes(&mut self.stream, bytes).inspect_err(|e| log_field_error("bytes", e))
    }

    pub fn read_bytes_field(&mut self, len: usize) -> Result<Vec<u8>> {
        self.require(Mode::Read)?;
        field::read_bytes(&mut self.stream, len).inspect_err(|e| log_field_error("bytes", e))
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require(&self, expected: Mode) -> Result<()> {
        if self.mode != expected {
            error!(path = %self.path.display(), %expected, actual = %self.mode, "wrong handle mode");
            return Err(FormatError::WrongMode { expected, actual: self.mode });
        }
        Ok(())
    }

    fn read_u64_logged(&mut self, what: &str) -> Result<u64> {
        field::read_u64(&mut self.stream).inspect_err(|e| {
            error!(path = %self.path.display(), "failed to read {what}: {e}");
        })
    }

    fn read_i32_logged(&mut self, what: &str) -> Result<i32> {
        field::read_i32(&mut self.stream).inspect_err(|e| {
            error!(path = %self.path.display(), "failed to read {what}: {e}");
        })
    }
}

fn log_field_error(kind: &str, err: &FormatError) {
    error!("{kind} field: {err}");
}

fn write_zeros<W: Write>(w: &mut W, mut count: u64) -> io::Result<()> {
    const ZEROS: [u8; 64] = [0; 64];
    while count > 0 {
        let n = count.min(ZEROS.len() as u64) as usize;
        w.write_all(&ZEROS[..n])?;
        count -= n as u64;
    }
    Ok(())
}
