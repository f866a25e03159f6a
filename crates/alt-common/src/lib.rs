//! Common types and configuration for the ALT model container
//!
//! This crate holds what every other ALT crate agrees on: the process-wide
//! format constants, the tensor element [`DataType`], and the layered
//! [`AltConfig`] (file, then environment, then validation).

pub mod config;
pub mod constants;
pub mod types;

pub use config::{
    AltConfig, AltConfigBuilder, ConfigError, FormatConfig, LogLevel, LoggingConfig,
    QuantizationConfig,
};
pub use types::DataType;
