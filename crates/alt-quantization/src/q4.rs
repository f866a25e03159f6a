//! Signed 4-bit block quantization, two codes per byte.
//!
//! Same scheme as the 8-bit codec with `scale = max(|x|) / 7` and codes
//! clamped to [-8, 7]. Sample `2i` goes in the low nibble of byte `i`, sample
//! `2i + 1` in the high nibble.

use alt_common::DataType;
use alt_common::constants::QUANT_BLOCK_SIZE;

use crate::error::{Result, check_block_count, check_blocking};
use crate::utils::{
    block_scale, code_max, dequantize_value, pack_nibbles, quantize_value, unpack_nibbles,
};

pub const Q4_MAX: f32 = code_max(DataType::QInt4);

/// One fixed-size 4-bit block: the shared scale and the packed codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockQ4 {
    pub scale: f32,
    pub packed: [u8; QUANT_BLOCK_SIZE / 2],
}

impl BlockQ4 {
    pub const ENCODED_LEN: usize = 4 + QUANT_BLOCK_SIZE / 2;

    pub fn quantize(samples: &[f32; QUANT_BLOCK_SIZE]) -> Self {
        let mut packed = [0u8; QUANT_BLOCK_SIZE / 2];
        let scale = quantize_block(samples, &mut packed);
        Self { scale, packed }
    }

    pub fn dequantize(&self) -> [f32; QUANT_BLOCK_SIZE] {
        let mut out = [0.0f32; QUANT_BLOCK_SIZE];
        dequantize_block(self.scale, &self.packed, &mut out);
        out
    }

    /// Unpacked codes, in sample order.
    pub fn codes(&self) -> [i8; QUANT_BLOCK_SIZE] {
        let mut codes = [0i8; QUANT_BLOCK_SIZE];
        for (pair, &byte) in codes.chunks_exact_mut(2).zip(&self.packed) {
            (pair[0], pair[1]) = unpack_nibbles(byte);
        }
        codes
    }
}

/// `block.len()` is even and equals `2 * packed.len()`.
fn quantize_block(block: &[f32], packed: &mut [u8]) -> f32 {
    let scale = block_scale(block, Q4_MAX);
    for (byte, pair) in packed.iter_mut().zip(block.chunks_exact(2)) {
        let lo = quantize_value(pair[0], scale, -8, 7);
        let hi = quantize_value(pair[1], scale, -8, 7);
        *byte = pack_nibbles(lo, hi);
    }
    scale
}

fn dequantize_block(scale: f32, packed: &[u8], out: &mut [f32]) {
    for (pair, &byte) in out.chunks_exact_mut(2).zip(packed) {
        let (lo, hi) = unpack_nibbles(byte);
        pair[0] = dequantize_value(lo, scale);
        pair[1] = dequantize_value(hi, scale);
    }
}

/// Quantize a row block by block. `block_size` must be even.
///
/// Returns one scale per block and `row.len() / 2` packed bytes.
pub fn quantize_row_q4(row: &[f32], block_size: usize) -> Result<(Vec<f32>, Vec<u8>)> {
    check_blocking(row.len(), block_size, true)?;
    let half = block_size / 2;
    let mut scales = Vec::with_capacity(row.len() / block_size);
    let mut packed = vec![0u8; row.len() / 2];
    for (block, out) in row.chunks_exact(block_size).zip(packed.chunks_exact_mut(half)) {
        scales.push(quantize_block(block, out));
    }
    Ok((scales, packed))
}

/// Inverse of [`quantize_row_q4`].
pub fn dequantize_row_q4(scales: &[f32], packed: &[u8], block_size: usize) -> Result<Vec<f32>> {
    let len = packed.len() * 2;
    check_blocking(len, block_size, true)?;
    check_block_count(len / block_size, scales.len())?;
    let half = block_size / 2;
    let mut out = vec![0.0f32; len];
    for ((&scale, block), dst) in
        scales.iter().zip(packed.chunks_exact(half)).zip(out.chunks_exact_mut(block_size))
    {
        dequantize_block(scale, block, dst);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuantError;

    #[test]
    fn zero_block() {
        let block = BlockQ4::quantize(&[0.0; 32]);
        assert_eq!(block.scale, 0.0);
        assert_eq!(block.packed, [0u8; 16]);
        assert_eq!(block.dequantize(), [0.0; 32]);
    }

    #[test]
    fn nibble_order_low_then_high() {
        let mut samples = [0.0f32; 32];
        samples[0] = 7.0;
        samples[1] = -7.0;
        let block = BlockQ4::quantize(&samples);
        assert_eq!(block.scale, 1.0);
        // lo = 7 (0x7), hi = -7 (0x9)
        assert_eq!(block.packed[0], 0x97);
        assert_eq!(&block.codes()[..2], &[7, -7]);
    }

    #[test]
    fn error_within_half_scale() {
        let samples: [f32; 32] = std::array::from_fn(|i| (i as f32 - 15.5) * 0.37);
        let block = BlockQ4::quantize(&samples);
        for (y, x) in block.dequantize().iter().zip(&samples) {
            assert!((y - x).abs() <= block.scale / 2.0 + 1e-6);
        }
    }

    #[test]
    fn odd_block_size_rejected() {
        assert_eq!(quantize_row_q4(&[0.0; 6], 3).unwrap_err(), QuantError::OddBlockSize(3));
        assert_eq!(
            dequantize_row_q4(&[0.0], &[0; 3], 3).unwrap_err(),
            QuantError::OddBlockSize(3)
        );
    }

    #[test]
    fn row_round_trip_shape() {
        let row: Vec<f32> = (0..64).map(|i| i as f32 - 32.0).collect();
        let (scales, packed) = quantize_row_q4(&row, 16).unwrap();
        assert_eq!(scales.len(), 4);
        assert_eq!(packed.len(), 32);
        let back = dequantize_row_q4(&scales, &packed, 16).unwrap();
        assert_eq!(back.len(), 64);
    }
}
