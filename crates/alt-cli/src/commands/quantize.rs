//! Quantization error report on a reproducible random row.

use std::io::Write;

use alt_common::{AltConfig, DataType};
use alt_quantization::QuantizedTensor;
use alt_quantization::utils::{max_abs_error, mse, snr_db};
use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

#[derive(Args, Debug)]
pub struct QuantizeCommand {
    /// float32, float16, qint8 or qint4 (default from configuration)
    #[arg(long, value_name = "TYPE")]
    pub data_type: Option<DataType>,

    /// Elements per block (default from configuration)
    #[arg(long, value_name = "N")]
    pub block_size: Option<usize>,

    /// Row length
    #[arg(long, value_name = "N", default_value_t = 4096)]
    pub count: usize,

    /// Seed for the value generator
    #[arg(long, value_name = "S", default_value_t = 42)]
    pub seed: u64,

    /// Largest absolute input value
    #[arg(long, default_value_t = 1.0)]
    pub range: f32,

    /// Output format as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantReport {
    pub data_type: DataType,
    pub block_size: usize,
    pub count: usize,
    pub payload_bytes: usize,
    pub compression_ratio: f32,
    pub mse: f32,
    pub snr_db: f32,
    pub max_abs_error: f32,
}

impl QuantizeCommand {
    pub fn execute<W: Write>(&self, config: &AltConfig, out: &mut W) -> Result<()> {
        let report = self.report(config)?;
        info!(data_type = %report.data_type, mse = report.mse, "quantization report");

        if self.json {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
            return Ok(());
        }
        writeln!(out, "data type          {}", report.data_type)?;
        writeln!(out, "block size         {}", report.block_size)?;
        writeln!(out, "elements           {}", report.count)?;
        writeln!(out, "payload bytes      {}", report.payload_bytes)?;
        writeln!(out, "compression        {:.2}x", report.compression_ratio)?;
        writeln!(out, "mse                {:.3e}", report.mse)?;
        writeln!(out, "snr                {:.2} dB", report.snr_db)?;
        writeln!(out, "max abs error      {:.3e}", report.max_abs_error)?;
        Ok(())
    }

    /// Quantize and dequantize one row; deterministic for a given seed.
    pub fn report(&self, config: &AltConfig) -> Result<QuantReport> {
        let data_type = self.data_type.unwrap_or(config.quantization.data_type);
        let block_size = self.block_size.unwrap_or(config.quantization.block_size);
        anyhow::ensure!(self.range > 0.0 && self.range.is_finite(), "--range must be positive");

        let mut rng = StdRng::seed_from_u64(self.seed);
        let values: Vec<f32> =
            (0..self.count).map(|_| rng.gen_range(-self.range..=self.range)).collect();

        let tensor = QuantizedTensor::quantize(&values, &[self.count], data_type, block_size)
            .with_context(|| {
                format!("cannot quantize {} values as {data_type} with block size {block_size}", self.count)
            })?;
        let restored = tensor.dequantize()?;

        Ok(QuantReport {
            data_type,
            block_size: tensor.block_size,
            count: self.count,
            payload_bytes: tensor.payload_len(),
            compression_ratio: tensor.compression_ratio(),
            mse: mse(&values, &restored)?,
            snr_db: snr_db(&values, &restored)?,
            max_abs_error: max_abs_error(&values, &restored)?,
        })
    }
}
