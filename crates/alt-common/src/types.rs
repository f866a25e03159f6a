//! Element types shared by the codec, the container sections and the config layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Storage type of tensor elements.
///
/// Discriminants are the on-disk `data_type` values of the tensors section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum DataType {
    /// IEEE-754 single precision, stored verbatim.
    Float32 = 0,
    /// IEEE-754 half precision.
    Float16 = 1,
    /// Block-quantized signed 8-bit codes with one f32 scale per block.
    #[default]
    QInt8 = 2,
    /// Block-quantized signed 4-bit codes, two per byte, one f32 scale per block.
    QInt4 = 3,
}

impl DataType {
    pub const ALL: [DataType; 4] =
        [DataType::Float32, DataType::Float16, DataType::QInt8, DataType::QInt4];

    /// Convert from the raw discriminant stored in a tensors section.
    pub const fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Float32),
            1 => Some(Self::Float16),
            2 => Some(Self::QInt8),
            3 => Some(Self::QInt4),
            _ => None,
        }
    }

    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether values are stored as block codes plus a shared scale.
    pub const fn is_quantized(self) -> bool {
        matches!(self, Self::QInt8 | Self::QInt4)
    }

    /// Whether two codes share one byte.
    pub const fn is_packed(self) -> bool {
        matches!(self, Self::QInt4)
    }

    /// Largest positive code of a quantized type (the scale divisor).
    pub const fn quant_range(self) -> Option<i32> {
        match self {
            Self::QInt8 => Some(127),
            Self::QInt4 => Some(7),
            Self::Float32 | Self::Float16 => None,
        }
    }

    /// Bits occupied by one element, not counting per-block scales.
    pub const fn bits_per_element(self) -> usize {
        match self {
            Self::Float32 => 32,
            Self::Float16 => 16,
            Self::QInt8 => 8,
            Self::QInt4 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float16 => "float16",
            Self::QInt8 => "qint8",
            Self::QInt4 => "qint4",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float32" | "f32" => Ok(Self::Float32),
            "float16" | "f16" => Ok(Self::Float16),
            "qint8" | "q8" => Ok(Self::QInt8),
            "qint4" | "q4" => Ok(Self::QInt4),
            other => Err(ConfigError::UnknownDataType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_round_trip() {
        for dt in DataType::ALL {
            assert_eq!(DataType::from_i32(dt.as_i32()), Some(dt));
        }
        assert_eq!(DataType::from_i32(4), None);
        assert_eq!(DataType::from_i32(-1), None);
    }

    #[test]
    fn quant_ranges() {
        assert_eq!(DataType::QInt8.quant_range(), Some(127));
        assert_eq!(DataType::QInt4.quant_range(), Some(7));
        assert_eq!(DataType::Float16.quant_range(), None);
        assert!(DataType::QInt4.is_packed());
        assert!(!DataType::QInt8.is_packed());
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("Q8".parse::<DataType>().unwrap(), DataType::QInt8);
        assert_eq!("float16".parse::<DataType>().unwrap(), DataType::Float16);
        assert!("int2".parse::<DataType>().is_err());
    }
}
