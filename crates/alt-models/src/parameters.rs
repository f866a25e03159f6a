//! Parameters section: architecture hyperparameters.

use std::io::{Read, Seek, Write};

use alt_format::field::{BOOL_LEN, F32_LEN, I32_LEN, string_len};
use alt_format::{MagicFile, SectionKind};
use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::section::Section;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    pub hidden_act: String,
    pub tie_word_embeddings: bool,
    pub hidden_size: i32,
    pub intermediate_size: i32,
    pub max_position_embeddings: i32,
    pub num_attention_heads: i32,
    pub num_hidden_layers: i32,
    pub num_key_value_heads: i32,
    pub sliding_window: i32,
    /// Stored for readers that do not derive it; must equal [`Self::head_dim`].
    pub head_size: i32,
    pub rms_norm_eps: f32,
    pub rope_theta: f32,
    pub initializer_range: f32,
}

impl Default for Parameters {
    /// A 7B-class decoder with full multi-head attention.
    fn default() -> Self {
        Self {
            hidden_act: "silu".into(),
            tie_word_embeddings: false,
            hidden_size: 4096,
            intermediate_size: 4 * 4096,
            max_position_embeddings: 32768,
            num_attention_heads: 32,
            num_hidden_layers: 32,
            num_key_value_heads: 32,
            sliding_window: 4096,
            head_size: 128,
            rms_norm_eps: 1e-5,
            rope_theta: 10000.0,
            initializer_range: 0.02,
        }
    }
}

impl Parameters {
    /// `hidden_size / num_attention_heads`, or 0 when there are no heads.
    pub fn head_dim(&self) -> i32 {
        if self.num_attention_heads == 0 { 0 } else { self.hidden_size / self.num_attention_heads }
    }

    /// Query heads served by each key/value head.
    pub fn kv_groups(&self) -> i32 {
        if self.num_key_value_heads == 0 {
            0
        } else {
            self.num_attention_heads / self.num_key_value_heads
        }
    }
}

const NUM_I32_FIELDS: u64 = 8;
const NUM_F32_FIELDS: u64 = 3;

impl Section for Parameters {
    const KIND: SectionKind = SectionKind::Parameters;

    fn encoded_len(&self) -> u64 {
        string_len(&self.hidden_act)
            + BOOL_LEN
            + NUM_I32_FIELDS * I32_LEN
            + NUM_F32_FIELDS * F32_LEN
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("hidden_size", self.hidden_size),
            ("intermediate_size", self.intermediate_size),
            ("max_position_embeddings", self.max_position_embeddings),
            ("num_attention_heads", self.num_attention_heads),
            ("num_hidden_layers", self.num_hidden_layers),
            ("num_key_value_heads", self.num_key_value_heads),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| *v <= 0) {
            return Err(ModelError::Parameters(format!("{name} must be positive, got {value}")));
        }
        if self.sliding_window < 0 {
            return Err(ModelError::Parameters(format!(
                "sliding_window must not be negative, got {}",
                self.sliding_window
            )));
        }
        if self.num_attention_heads % self.num_key_value_heads != 0 {
            return Err(ModelError::Parameters(format!(
                "num_attention_heads ({}) is not a multiple of num_key_value_heads ({})",
                self.num_attention_heads, self.num_key_value_heads
            )));
        }
        if self.head_size != self.head_dim() {
            return Err(ModelError::Parameters(format!(
                "head_size {} does not match hidden_size / num_attention_heads = {}",
                self.head_size,
                self.head_dim()
            )));
        }
        if self.hidden_act.is_empty() {
            return Err(ModelError::Parameters("hidden_act is empty".into()));
        }
        Ok(())
    }

    fn write_payload<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        magic.write_string_field(&self.hidden_act)?;
        magic.write_bool_field(self.tie_word_embeddings)?;
        for v in [
            self.hidden_size,
            self.intermediate_size,
            self.max_position_embeddings,
            self.num_attention_heads,
            self.num_hidden_layers,
            self.num_key_value_heads,
            self.sliding_window,
            self.head_size,
        ] {
            magic.write_i32_field(v)?;
        }
        for v in [self.rms_norm_eps, self.rope_theta, self.initializer_range] {
            magic.write_f32_field(v)?;
        }
        Ok(())
    }

    fn read_payload<S: Read + Write + Seek>(magic: &mut MagicFile<S>, _length: u64) -> Result<Self> {
        let params = Self {
            hidden_act: magic.read_string_field()?,
            tie_word_embeddings: magic.read_bool_field()?,
            hidden_size: magic.read_i32_field()?,
            intermediate_size: magic.read_i32_field()?,
            max_position_embeddings: magic.read_i32_field()?,
            num_attention_heads: magic.read_i32_field()?,
            num_hidden_layers: magic.read_i32_field()?,
            num_key_value_heads: magic.read_i32_field()?,
            sliding_window: magic.read_i32_field()?,
            head_size: magic.read_i32_field()?,
            rms_norm_eps: magic.read_f32_field()?,
            rope_theta: magic.read_f32_field()?,
            initializer_range: magic.read_f32_field()?,
        };
        params.validate()?;
        Ok(params)
    }
}
