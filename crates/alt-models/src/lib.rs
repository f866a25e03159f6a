//! Typed ALT sections and whole-model load/save
//!
//! Each section type implements [`Section`], which frames its payload with a
//! marker carrying the exact byte length and verifies that length on read.
//! [`AltModel`] strings the four sections together between the start and end
//! markers.

pub mod error;
pub mod general;
pub mod model;
pub mod parameters;
pub mod section;
pub mod tensors;
pub mod tokenizer;

pub use error::{ModelError, Result};
pub use general::General;
pub use model::AltModel;
pub use parameters::Parameters;
pub use section::Section;
pub use tensors::{MAX_DIMS, RawTensor, TensorEntry, TensorInfo, Tensors};
pub use tokenizer::{MAX_VOCAB_SIZE, SpecialTokens, Token, TokenType, Tokenizer};
