//! Shared helpers for the block codecs and error statistics.

use alt_common::DataType;

use crate::error::{QuantError, Result};

/// Largest positive code of a quantized type, used as the scale divisor.
/// Float types have no code range and get 1.
pub const fn code_max(data_type: DataType) -> f32 {
    match data_type.quant_range() {
        Some(range) => range as f32,
        None => 1.0,
    }
}

/// `max(|x|) / qmax` over the finite samples.
///
/// Zero for an all-zero block. Infinities and NaN do not contribute, so a
/// single non-finite sample cannot poison the whole block; infinite samples
/// then saturate to the extreme codes.
pub fn block_scale(block: &[f32], qmax: f32) -> f32 {
    let max_abs = block
        .iter()
        .filter(|x| x.is_finite())
        .fold(0.0f32, |acc, &x| acc.max(x.abs()));
    max_abs / qmax
}

/// `round(value / scale)` (half away from zero), clamped to `[min, max]`.
///
/// A zero scale yields code 0.
#[inline]
pub fn quantize_value(value: f32, scale: f32, min: i8, max: i8) -> i8 {
    if scale == 0.0 {
        return 0;
    }
    (value / scale).round().clamp(f32::from(min), f32::from(max)) as i8
}

#[inline]
pub fn dequantize_value(code: i8, scale: f32) -> f32 {
    f32::from(code) * scale
}

/// Pack two 4-bit codes: `lo` in bits 0..4, `hi` in bits 4..8.
#[inline]
pub fn pack_nibbles(lo: i8, hi: i8) -> u8 {
    ((hi as u8 & 0x0F) << 4) | (lo as u8 & 0x0F)
}

/// Inverse of [`pack_nibbles`], sign-extending both halves.
#[inline]
pub fn unpack_nibbles(byte: u8) -> (i8, i8) {
    let lo = ((byte << 4) as i8) >> 4;
    let hi = (byte as i8) >> 4;
    (lo, hi)
}

/// Mean squared error between two equal-length slices.
pub fn mse(original: &[f32], reconstructed: &[f32]) -> Result<f32> {
    check_same_len(original, reconstructed)?;
    if original.is_empty() {
        return Ok(0.0);
    }
    let sum: f32 = original.iter().zip(reconstructed).map(|(&a, &b)| (a - b).powi(2)).sum();
    Ok(sum / original.len() as f32)
}

/// Signal-to-noise ratio in decibels. Infinite when reconstruction is exact.
pub fn snr_db(original: &[f32], reconstructed: &[f32]) -> Result<f32> {
    let noise = mse(original, reconstructed)?;
    if noise == 0.0 {
        return Ok(f32::INFINITY);
    }
    let signal = original.iter().map(|&x| x.powi(2)).sum::<f32>() / original.len() as f32;
    Ok(10.0 * (signal / noise).log10())
}

pub fn max_abs_error(original: &[f32], reconstructed: &[f32]) -> Result<f32> {
    check_same_len(original, reconstructed)?;
    Ok(original.iter().zip(reconstructed).fold(0.0f32, |acc, (&a, &b)| acc.max((a - b).abs())))
}

fn check_same_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(QuantError::LengthMismatch { expected: a.len(), actual: b.len() });
    }
    Ok(())
}
