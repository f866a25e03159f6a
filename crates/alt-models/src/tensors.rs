//! Tensors section: named, shaped, encoded weight payloads.

use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use alt_common::DataType;
use alt_format::field::{I32_LEN, I64_LEN, string_len};
use alt_format::{MagicFile, SectionKind};
use alt_quantization::{QuantizedTensor, expected_payload_len};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::section::Section;

/// Most dimensions a stored tensor may have.
pub const MAX_DIMS: usize = 8;

/// Smallest possible encoded entry: 1-byte name, n_dims, data_type, block_size, payload_len.
const MIN_ENTRY_LEN: u64 = I32_LEN + 1 + 3 * I32_LEN + I64_LEN;

/// Unencoded input to [`Tensors::quantize_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl RawTensor {
    pub fn new(name: impl Into<String>, shape: &[usize], values: Vec<f32>) -> Self {
        Self { name: name.into(), shape: shape.to_vec(), values }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TensorEntry {
    pub name: String,
    pub tensor: QuantizedTensor,
}

/// Catalogue view of an entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub data_type: DataType,
    pub block_size: usize,
    pub payload_len: usize,
}

impl TensorEntry {
    pub fn quantize(
        name: impl Into<String>,
        values: &[f32],
        shape: &[usize],
        data_type: DataType,
        block_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        let tensor = QuantizedTensor::quantize(values, shape, data_type, block_size)
            .map_err(|e| ModelError::tensor(&name, e.to_string()))?;
        Ok(Self { name, tensor })
    }

    pub fn dequantize(&self) -> Result<Vec<f32>> {
        Ok(self.tensor.dequantize()?)
    }

    pub fn info(&self) -> TensorInfo {
        TensorInfo {
            name: self.name.clone(),
            shape: self.tensor.shape.clone(),
            data_type: self.tensor.data_type,
            block_size: self.tensor.block_size,
            payload_len: self.tensor.payload_len(),
        }
    }

    fn encoded_len(&self) -> u64 {
        string_len(&self.name)
            + I32_LEN
            + I32_LEN * self.tensor.shape.len() as u64
            + 2 * I32_LEN
            + I64_LEN
            + self.tensor.payload_len() as u64
    }

    fn validate(&self) -> Result<()> {
        if self.tensor.shape.len() > MAX_DIMS {
            return Err(ModelError::tensor(&self.name, format!("more than {MAX_DIMS} dimensions")));
        }
        if let Some(d) = self.tensor.shape.iter().find(|&&d| i32::try_from(d).is_err()) {
            return Err(ModelError::tensor(&self.name, format!("dimension {d} exceeds i32")));
        }
        if i32::try_from(self.tensor.block_size).is_err() {
            return Err(ModelError::tensor(&self.name, "block size exceeds i32"));
        }
        Ok(())
    }

    fn write<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        let t = &self.tensor;
        magic.write_string_field(&self.name)?;
        magic.write_i32_field(t.shape.len() as i32)?;
        for &d in &t.shape {
            magic.write_i32_field(d as i32)?;
        }
        magic.write_i32_field(t.data_type.as_i32())?;
        magic.write_i32_field(t.block_size as i32)?;
        magic.write_i64_field(t.payload_len() as i64)?;
        magic.write_bytes_field(&t.to_payload())?;
        Ok(())
    }

    /// `remaining` bounds the payload so a corrupt length cannot force a huge allocation.
    fn read<S: Read + Write + Seek>(magic: &mut MagicFile<S>, remaining: u64) -> Result<Self> {
        let name = magic.read_string_field()?;

        let n_dims = magic.read_i32_field()?;
        if !(0..=MAX_DIMS as i32).contains(&n_dims) {
            return Err(ModelError::tensor(&name, format!("n_dims {n_dims} out of range")));
        }
        let mut shape = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            let d = magic.read_i32_field()?;
            let d = usize::try_from(d)
                .map_err(|_| ModelError::tensor(&name, format!("negative dimension {d}")))?;
            shape.push(d);
        }
        let numel = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| ModelError::tensor(&name, "element count overflows"))?;

        let raw_type = magic.read_i32_field()?;
        let data_type = DataType::from_i32(raw_type)
            .ok_or_else(|| ModelError::tensor(&name, format!("unknown data type {raw_type}")))?;
        let block_size = magic.read_i32_field()?;
        let block_size = usize::try_from(block_size)
            .map_err(|_| ModelError::tensor(&name, format!("negative block size {block_size}")))?;

        let payload_len = magic.read_i64_field()?;
        let payload_len = u64::try_from(payload_len)
            .map_err(|_| ModelError::tensor(&name, format!("negative payload length {payload_len}")))?;
        if payload_len > remaining {
            return Err(ModelError::tensor(
                &name,
                format!("payload of {payload_len} bytes overruns the section"),
            ));
        }
        let expected = expected_payload_len(data_type, numel, block_size)
            .map_err(|e| ModelError::tensor(&name, e.to_string()))?;
        if payload_len != expected as u64 {
            return Err(ModelError::tensor(
                &name,
                format!("payload is {payload_len} bytes, shape and type need {expected}"),
            ));
        }

        let payload = magic.read_bytes_field(expected)?;
        let tensor = QuantizedTensor::from_payload(data_type, &shape, block_size, &payload)?;
        Ok(Self { name, tensor })
    }
}

/// All tensors of a model, in file order, with unique names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tensors {
    entries: Vec<TensorEntry>,
}

impl Tensors {
    pub fn new(entries: Vec<TensorEntry>) -> Result<Self> {
        {
            let mut seen = HashSet::with_capacity(entries.len());
            for e in &entries {
                if !seen.insert(e.name.as_str()) {
                    return Err(ModelError::tensor(&e.name, "duplicate name"));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Encode every tensor with the same storage type, in parallel.
    ///
    /// Order is preserved. If several tensors fail, one of their errors is returned.
    pub fn quantize_all(raw: &[RawTensor], data_type: DataType, block_size: usize) -> Result<Self> {
        let entries = raw
            .par_iter()
            .map(|r| TensorEntry::quantize(r.name.clone(), &r.values, &r.shape, data_type, block_size))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = entries.len(), %data_type, block_size, "quantized tensors");
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TensorEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TensorEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn infos(&self) -> Vec<TensorInfo> {
        self.entries.iter().map(TensorEntry::info).collect()
    }
}

impl Section for Tensors {
    const KIND: SectionKind = SectionKind::Tensors;

    fn encoded_len(&self) -> u64 {
        I32_LEN + self.entries.iter().map(TensorEntry::encoded_len).sum::<u64>()
    }

    fn validate(&self) -> Result<()> {
        if i32::try_from(self.entries.len()).is_err() {
            return Err(ModelError::tensor("", "too many tensors"));
        }
        self.entries.iter().try_for_each(TensorEntry::validate)
    }

    fn write_payload<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        magic.write_i32_field(self.entries.len() as i32)?;
        for entry in &self.entries {
            entry.write(magic)?;
        }
        Ok(())
    }

    fn read_payload<S: Read + Write + Seek>(magic: &mut MagicFile<S>, length: u64) -> Result<Self> {
        let start = magic.position()?;
        let count = magic.read_i32_field()?;
        if count < 0 || count as u64 * MIN_ENTRY_LEN > length.saturating_sub(I32_LEN) {
            return Err(ModelError::tensor("", format!("tensor_count {count} out of range")));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let consumed = magic.position()? - start;
            let remaining = length.saturating_sub(consumed);
            entries.push(TensorEntry::read(magic, remaining)?);
        }
        Self::new(entries)
    }
}
