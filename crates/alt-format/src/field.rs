//! Typed field codec.
//!
//! Fixed-width scalars and length-prefixed strings over any byte stream.
//! All multi-byte values are little-endian. A short read or write is always an
//! error; no function hands back a partially read field.

use std::io::{Read, Write};

use alt_common::constants::MAX_STRING_LEN;

use crate::error::{FormatError, Result};

/// Encoded widths, used by section assemblers to precompute payload lengths.
pub const BOOL_LEN: u64 = 1;
pub const I32_LEN: u64 = 4;
pub const F32_LEN: u64 = 4;
pub const I64_LEN: u64 = 8;

/// Bytes occupied by `s` as a string field: the 4-byte prefix plus the raw bytes.
#[inline]
pub fn string_len(s: &str) -> u64 {
    I32_LEN + s.len() as u64
}

#[inline]
pub fn write_bool<W: Write>(w: &mut W, value: bool) -> Result<()> {
    w.write_all(&[u8::from(value)])?;
    Ok(())
}

/// Reads one byte; anything other than 0 or 1 is malformed.
#[inline]
pub fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    match b[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FormatError::Malformed(format!("boolean byte {other:#04x}"))),
    }
}

#[inline]
pub fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_le_bytes(b))
}

#[inline]
pub fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

#[inline]
pub fn write_f32<W: Write>(w: &mut W, value: f32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_le_bytes(b))
}

#[inline]
pub fn write_i64<W: Write>(w: &mut W, value: i64) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

#[inline]
pub fn write_u64<W: Write>(w: &mut W, value: u64) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Writes a 4-byte length N followed by exactly N bytes, no terminator.
///
/// Empty strings cannot be represented: a zero length is rejected on read.
pub fn write_string<W: Write>(w: &mut W, value: &str) -> Result<()> {
    let len = checked_string_len(value.len())?;
    write_i32(w, len)?;
    w.write_all(value.as_bytes())?;
    Ok(())
}

/// Reads a length-prefixed UTF-8 string into a fresh buffer owned by the caller.
pub fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_i32(r)?;
    if len <= 0 {
        return Err(FormatError::Malformed(format!("string length {len}")));
    }
    let len = checked_string_len(len as usize)?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| FormatError::Malformed(format!("string is not UTF-8: {e}")))
}

/// Raw bytes with no prefix; the length travels elsewhere.
#[inline]
pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    w.write_all(bytes)?;
    Ok(())
}

pub fn read_bytes<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn checked_string_len(len: usize) -> Result<i32> {
    if len == 0 {
        return Err(FormatError::Malformed("empty string".into()));
    }
    if len > MAX_STRING_LEN {
        return Err(FormatError::Malformed(format!(
            "string of {len} bytes exceeds limit of {MAX_STRING_LEN}"
        )));
    }
    // MAX_STRING_LEN < i32::MAX
    Ok(len as i32)
}
