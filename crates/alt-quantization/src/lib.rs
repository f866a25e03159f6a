//! Quantization codecs for ALT tensors
//!
//! Stateless conversions between f32 samples and compact encodings:
//! - [`fp16`]: IEEE half precision by bit manipulation
//! - [`q8`]: signed 8-bit codes, one f32 scale per block
//! - [`q4`]: signed 4-bit codes packed two per byte, one f32 scale per block
//!
//! [`QuantizedTensor`] ties these to a [`DataType`] and produces the payload
//! bytes stored in a tensors section.

pub mod error;
pub mod fp16;
pub mod q4;
pub mod q8;
pub mod utils;

pub use alt_common::DataType;
pub use error::{QuantError, Result};
pub use fp16::{decode_fp16, decode_fp16_row, encode_fp16, encode_fp16_row};
pub use q4::{BlockQ4, dequantize_row_q4, quantize_row_q4};
pub use q8::{BlockQ8, dequantize_row_q8, quantize_row_q8};

use tracing::debug;

use error::check_blocking;

/// A tensor's samples in one of the four storage types.
///
/// For quantized types `scales` holds one entry per block and `data` holds the
/// codes (one byte per sample for QInt8, one byte per pair for QInt4). For
/// float types `scales` is empty, `block_size` is 0, and `data` holds the
/// little-endian element bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedTensor {
    pub data_type: DataType,
    pub shape: Vec<usize>,
    pub block_size: usize,
    pub scales: Vec<f32>,
    pub data: Vec<u8>,
}

impl QuantizedTensor {
    /// Encode `values` (row-major, `shape.iter().product()` elements).
    ///
    /// `block_size` is only consulted for quantized types.
    pub fn quantize(
        values: &[f32],
        shape: &[usize],
        data_type: DataType,
        block_size: usize,
    ) -> Result<Self> {
        let numel = element_count(shape)?;
        if numel != values.len() {
            return Err(QuantError::ShapeMismatch {
                shape: shape.to_vec(),
                expected: numel,
                actual: values.len(),
            });
        }

        let (block_size, scales, data): (usize, Vec<f32>, Vec<u8>) = match data_type {
            DataType::Float32 => {
                (0, Vec::new(), values.iter().flat_map(|v| v.to_le_bytes()).collect())
            }
            DataType::Float16 => (
                0,
                Vec::new(),
                values.iter().flat_map(|&v| encode_fp16(v).to_le_bytes()).collect(),
            ),
            DataType::QInt8 => {
                let (scales, codes) = quantize_row_q8(values, block_size)?;
                (block_size, scales, codes.into_iter().map(|c| c as u8).collect())
            }
            DataType::QInt4 => {
                let (scales, packed) = quantize_row_q4(values, block_size)?;
                (block_size, scales, packed)
            }
        };

        debug!(%data_type, ?shape, block_size, blocks = scales.len(), "quantized tensor");
        Ok(Self { data_type, shape: shape.to_vec(), block_size, scales, data })
    }

    /// Decode back to f32 samples.
    pub fn dequantize(&self) -> Result<Vec<f32>> {
        match self.data_type {
            DataType::Float32 => Ok(self
                .data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()),
            DataType::Float16 => Ok(self
                .data
                .chunks_exact(2)
                .map(|b| decode_fp16(u16::from_le_bytes([b[0], b[1]])))
                .collect()),
            DataType::QInt8 => {
                let codes: Vec<i8> = self.data.iter().map(|&b| b as i8).collect();
                dequantize_row_q8(&self.scales, &codes, self.block_size)
            }
            DataType::QInt4 => dequantize_row_q4(&self.scales, &self.data, self.block_size),
        }
    }

    pub fn numel(&self) -> Result<usize> {
        element_count(&self.shape)
    }

    /// Bytes this tensor occupies in a tensors-section payload.
    pub fn payload_len(&self) -> usize {
        self.scales.len() * 4 + self.data.len()
    }

    /// Serialize as a section payload: for quantized types each block is its
    /// f32 scale followed by its codes; float types are the raw element bytes.
    pub fn to_payload(&self) -> Vec<u8> {
        if !self.data_type.is_quantized() {
            return self.data.clone();
        }
        let stride = self.code_bytes_per_block();
        let mut out = Vec::with_capacity(self.payload_len());
        for (scale, codes) in self.scales.iter().zip(self.data.chunks(stride.max(1))) {
            out.extend_from_slice(&scale.to_le_bytes());
            out.extend_from_slice(codes);
        }
        out
    }

    /// Inverse of [`to_payload`](Self::to_payload). Checks the payload size
    /// against the shape, type and block size before splitting it.
    pub fn from_payload(
        data_type: DataType,
        shape: &[usize],
        block_size: usize,
        payload: &[u8],
    ) -> Result<Self> {
        let numel = element_count(shape)?;
        let expected = expected_payload_len(data_type, numel, block_size)?;
        if payload.len() != expected {
            return Err(QuantError::PayloadLength { expected, actual: payload.len() });
        }

        if !data_type.is_quantized() {
            return Ok(Self {
                data_type,
                shape: shape.to_vec(),
                block_size: 0,
                scales: Vec::new(),
                data: payload.to_vec(),
            });
        }

        let code_bytes = if data_type.is_packed() { block_size / 2 } else { block_size };
        let blocks = numel / block_size;
        let mut scales = Vec::with_capacity(blocks);
        let mut data = Vec::with_capacity(blocks * code_bytes);
        for block in payload.chunks_exact(4 + code_bytes) {
            scales.push(f32::from_le_bytes([block[0], block[1], block[2], block[3]]));
            data.extend_from_slice(&block[4..]);
        }
        Ok(Self { data_type, shape: shape.to_vec(), block_size, scales, data })
    }

    /// Original f32 size divided by payload size.
    pub fn compression_ratio(&self) -> f32 {
        let payload = self.payload_len();
        if payload == 0 {
            return 1.0;
        }
        let numel: f64 = self.shape.iter().map(|&d| d as f64).product();
        (numel * 4.0 / payload as f64) as f32
    }

    fn code_bytes_per_block(&self) -> usize {
        if self.data_type.is_packed() { self.block_size / 2 } else { self.block_size }
    }
}

/// Product of the dimensions; a scalar (empty shape) has one element.
pub fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| QuantError::ShapeOverflow(shape.to_vec()))
}

/// Payload size for `numel` elements of `data_type`, validating the blocking.
pub fn expected_payload_len(data_type: DataType, numel: usize, block_size: usize) -> Result<usize> {
    let len = match data_type {
        DataType::Float32 | DataType::Float16 => {
            numel.checked_mul(data_type.bits_per_element() / 8)
        }
        DataType::QInt8 => {
            check_blocking(numel, block_size, false)?;
            (numel / block_size).checked_mul(4 + block_size)
        }
        DataType::QInt4 => {
            check_blocking(numel, block_size, true)?;
            (numel / block_size).checked_mul(4 + block_size / 2)
        }
    };
    len.ok_or(QuantError::Overflow { numel })
}
