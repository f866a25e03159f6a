//! Signed 8-bit block quantization.
//!
//! Each block of samples shares one scale `max(|x|) / 127`; codes are
//! `round(x / scale)`. Reconstruction error is at most `scale / 2` per sample.

use alt_common::DataType;
use alt_common::constants::QUANT_BLOCK_SIZE;

use crate::error::{Result, check_block_count, check_blocking};
use crate::utils::{block_scale, code_max, dequantize_value, quantize_value};

pub const Q8_MAX: f32 = code_max(DataType::QInt8);

/// One fixed-size 8-bit block: the shared scale and its codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockQ8 {
    pub scale: f32,
    pub codes: [i8; QUANT_BLOCK_SIZE],
}

impl BlockQ8 {
    /// Bytes this block occupies in a tensor payload.
    pub const ENCODED_LEN: usize = 4 + QUANT_BLOCK_SIZE;

    pub fn quantize(samples: &[f32; QUANT_BLOCK_SIZE]) -> Self {
        let mut codes = [0i8; QUANT_BLOCK_SIZE];
        let scale = quantize_block(samples, &mut codes);
        Self { scale, codes }
    }

    pub fn dequantize(&self) -> [f32; QUANT_BLOCK_SIZE] {
        let mut out = [0.0f32; QUANT_BLOCK_SIZE];
        dequantize_block(self.scale, &self.codes, &mut out);
        out
    }
}

/// Quantize one block into `codes` (same length) and return its scale.
fn quantize_block(block: &[f32], codes: &mut [i8]) -> f32 {
    let scale = block_scale(block, Q8_MAX);
    for (code, &x) in codes.iter_mut().zip(block) {
        *code = quantize_value(x, scale, -127, 127);
    }
    scale
}

fn dequantize_block(scale: f32, codes: &[i8], out: &mut [f32]) {
    for (y, &code) in out.iter_mut().zip(codes) {
        *y = dequantize_value(code, scale);
    }
}

/// Quantize a row block by block. Returns one scale per block and one code per sample.
pub fn quantize_row_q8(row: &[f32], block_size: usize) -> Result<(Vec<f32>, Vec<i8>)> {
    check_blocking(row.len(), block_size, false)?;
    let mut scales = Vec::with_capacity(row.len() / block_size);
    let mut codes = vec![0i8; row.len()];
    for (block, out) in row.chunks_exact(block_size).zip(codes.chunks_exact_mut(block_size)) {
        scales.push(quantize_block(block, out));
    }
    Ok((scales, codes))
}

/// Inverse of [`quantize_row_q8`]. `codes` must hold exactly `scales.len()` blocks.
pub fn dequantize_row_q8(scales: &[f32], codes: &[i8], block_size: usize) -> Result<Vec<f32>> {
    check_blocking(codes.len(), block_size, false)?;
    check_block_count(codes.len() / block_size, scales.len())?;
    let mut out = vec![0.0f32; codes.len()];
    for ((&scale, block), dst) in
        scales.iter().zip(codes.chunks_exact(block_size)).zip(out.chunks_exact_mut(block_size))
    {
        dequantize_block(scale, block, dst);
    }
    Ok(out)
}
