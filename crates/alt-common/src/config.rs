//! Configuration with TOML/JSON file, environment variable, and default sources.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fmt, fs};

use crate::constants::{
    MAGIC_ALIGNMENT, MAGIC_VERSION, MAX_ALIGNMENT, MIN_ALIGNMENT, QUANT_BLOCK_SIZE,
    is_supported_alignment,
};
use crate::types::DataType;


/// Environment variables consulted by [`AltConfig::apply_env_overrides`].
pub const ENV_VERSION: &str = "ALT_VERSION";
pub const ENV_ALIGNMENT: &str = "ALT_ALIGNMENT";
pub const ENV_DATA_TYPE: &str = "ALT_DATA_TYPE";
pub const ENV_BLOCK_SIZE: &str = "ALT_BLOCK_SIZE";
pub const ENV_LOG_LEVEL: &str = "ALT_LOG_LEVEL";

// ── Errors ──────────────────────────────────────────────────────────

/// Errors produced by configuration loading or validation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedExtension(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid environment variable value for {key}: {value}")]
    InvalidEnvVar { key: String, value: String },
}

// ── LogLevel ────────────────────────────────────────────────────────

/// Default verbosity for the diagnostic sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }
}

// ── Sections ────────────────────────────────────────────────────────

/// Container layout written into the StartMarker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub version: i32,
    pub alignment: i32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self { version: MAGIC_VERSION, alignment: MAGIC_ALIGNMENT }
    }
}

/// Element storage used when a model's tensors are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    pub data_type: DataType,
    pub block_size: usize,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self { data_type: DataType::QInt8, block_size: QUANT_BLOCK_SIZE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

// ── AltConfig ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AltConfig {
    pub format: FormatConfig,
    pub quantization: QuantizationConfig,
    pub logging: LoggingConfig,
}

impl AltConfig {
    pub fn builder() -> AltConfigBuilder {
        AltConfigBuilder::default()
    }

    /// Load a configuration file, dispatching on its extension (`.toml` or `.json`).
    ///
    /// Missing keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&text)?),
            Some("json") => Ok(serde_json::from_str(&text)?),
            other => Err(ConfigError::UnsupportedExtension(other.unwrap_or("").to_string())),
        }
    }

    /// Defaults with `ALT_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// File (if given), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overwrite fields from `ALT_*` environment variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var(ENV_VERSION) {
            self.format.version = parse_env(ENV_VERSION, &v)?;
        }
        if let Ok(v) = env::var(ENV_ALIGNMENT) {
            self.format.alignment = parse_env(ENV_ALIGNMENT, &v)?;
        }
        if let Ok(v) = env::var(ENV_DATA_TYPE) {
            self.quantization.data_type = v.parse()?;
        }
        if let Ok(v) = env::var(ENV_BLOCK_SIZE) {
            self.quantization.block_size = parse_env(ENV_BLOCK_SIZE, &v)?;
        }
        if let Ok(v) = env::var(ENV_LOG_LEVEL) {
            self.logging.level = v.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format.version != MAGIC_VERSION {
            return Err(ConfigError::Validation(format!(
                "format.version must be {MAGIC_VERSION}, got {}",
                self.format.version
            )));
        }
        if !is_supported_alignment(self.format.alignment) {
            return Err(ConfigError::Validation(format!(
                "format.alignment must be a power of two in [{MIN_ALIGNMENT}, {MAX_ALIGNMENT}], got {}",
                self.format.alignment
            )));
        }
        if self.quantization.block_size == 0 {
            return Err(ConfigError::Validation("quantization.block_size must be >= 1".into()));
        }
        if self.quantization.data_type.is_packed() && self.quantization.block_size % 2 != 0 {
            return Err(ConfigError::Validation(format!(
                "quantization.block_size must be even for {}, got {}",
                self.quantization.data_type, self.quantization.block_size
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidEnvVar { key: key.to_string(), value: val.to_string() })
}

// ── Builder ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AltConfigBuilder {
    config: AltConfig,
}

impl AltConfigBuilder {
    pub fn version(mut self, version: i32) -> Self {
        self.config.format.version = version;
        self
    }

    pub fn alignment(mut self, alignment: i32) -> Self {
        self.config.format.alignment = alignment;
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.config.quantization.data_type = data_type;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.quantization.block_size = block_size;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Finish, rejecting invalid combinations.
    pub fn build(self) -> Result<AltConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
