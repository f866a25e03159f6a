use alt_format::FormatError;
use alt_quantization::QuantError;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Quantization(#[from] QuantError),
    #[error("invalid general section: {0}")]
    General(String),
    #[error("invalid parameters: {0}")]
    Parameters(String),
    #[error("invalid tokenizer: {0}")]
    Tokenizer(String),
    #[error("invalid tensor {name:?}: {reason}")]
    Tensor { name: String, reason: String },
}

impl ModelError {
    pub(crate) fn tensor(name: &str, reason: impl Into<String>) -> Self {
        Self::Tensor { name: name.to_string(), reason: reason.into() }
    }

    /// The container-level error, if this came from the format layer.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
