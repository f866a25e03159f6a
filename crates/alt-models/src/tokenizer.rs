//! Tokenizer section: vocabulary, scores and special token ids.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek, Write};

use alt_format::field::{F32_LEN, I32_LEN, string_len};
use alt_format::{MagicFile, SectionKind};
use serde::Serialize;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::section::Section;

/// Largest vocabulary accepted on read.
pub const MAX_VOCAB_SIZE: usize = 1 << 22;

/// Smallest possible encoded token: 1-byte string plus score and type.
const MIN_TOKEN_LEN: u64 = I32_LEN + 1 + F32_LEN + I32_LEN;

/// Token classification, numbered as in GGUF vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[repr(i32)]
pub enum TokenType {
    #[default]
    Normal = 0,
    Unknown = 1,
    Control = 2,
    UserDefined = 3,
    Unused = 4,
    Byte = 5,
}

impl TokenType {
    pub const fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::Unknown),
            2 => Some(Self::Control),
            3 => Some(Self::UserDefined),
            4 => Some(Self::Unused),
            5 => Some(Self::Byte),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Unknown => "unknown",
            Self::Control => "control",
            Self::UserDefined => "user_defined",
            Self::Unused => "unused",
            Self::Byte => "byte",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub data: String,
    pub score: f32,
    pub token_type: TokenType,
}

impl Token {
    pub fn new(data: impl Into<String>, score: f32, token_type: TokenType) -> Self {
        Self { data: data.into(), score, token_type }
    }
}

/// Ids of the special tokens; -1 means the tokenizer has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialTokens {
    pub bos: i32,
    pub eos: i32,
    pub pad: i32,
    pub unk: i32,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self { bos: -1, eos: -1, pad: -1, unk: -1 }
    }
}

/// A validated vocabulary. A token's id is its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenizer {
    special: SpecialTokens,
    tokens: Vec<Token>,
    index: HashMap<String, i32>,
}

impl Tokenizer {
    /// Build from tokens in id order, rejecting empty or oversized
    /// vocabularies, duplicate token strings and out-of-range special ids.
    pub fn new(tokens: Vec<Token>, special: SpecialTokens) -> Result<Self> {
        if tokens.is_empty() {
            return Err(ModelError::Tokenizer("vocabulary is empty".into()));
        }
        if tokens.len() > MAX_VOCAB_SIZE {
            return Err(ModelError::Tokenizer(format!(
                "vocabulary of {} exceeds limit of {MAX_VOCAB_SIZE}",
                tokens.len()
            )));
        }

        let mut index = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if token.data.is_empty() {
                return Err(ModelError::Tokenizer(format!("token {id} is empty")));
            }
            if let Some(prev) = index.insert(token.data.clone(), id as i32) {
                return Err(ModelError::Tokenizer(format!(
                    "token {:?} appears at both {prev} and {id}",
                    token.data
                )));
            }
        }

        let vocab = tokens.len() as i32;
        for (name, id) in
            [("bos", special.bos), ("eos", special.eos), ("pad", special.pad), ("unk", special.unk)]
        {
            if id < -1 || id >= vocab {
                return Err(ModelError::Tokenizer(format!(
                    "{name}_id {id} outside vocabulary of {vocab}"
                )));
            }
        }

        Ok(Self { special, tokens, index })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokens.len()
    }

    pub fn special(&self) -> SpecialTokens {
        self.special
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: i32) -> Option<&Token> {
        usize::try_from(id).ok().and_then(|i| self.tokens.get(i))
    }

    pub fn id_of(&self, data: &str) -> Option<i32> {
        self.index.get(data).copied()
    }
}

impl Section for Tokenizer {
    const KIND: SectionKind = SectionKind::Tokenizer;

    fn encoded_len(&self) -> u64 {
        5 * I32_LEN
            + self.tokens.iter().map(|t| string_len(&t.data) + F32_LEN + I32_LEN).sum::<u64>()
    }

    fn write_payload<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        magic.write_i32_field(self.tokens.len() as i32)?;
        magic.write_i32_field(self.special.bos)?;
        magic.write_i32_field(self.special.eos)?;
        magic.write_i32_field(self.special.pad)?;
        magic.write_i32_field(self.special.unk)?;
        for token in &self.tokens {
            magic.write_string_field(&token.data)?;
            magic.write_f32_field(token.score)?;
            magic.write_i32_field(token.token_type as i32)?;
        }
        Ok(())
    }

    fn read_payload<S: Read + Write + Seek>(magic: &mut MagicFile<S>, length: u64) -> Result<Self> {
        let vocab_size = magic.read_i32_field()?;
        if vocab_size <= 0 || vocab_size as usize > MAX_VOCAB_SIZE {
            return Err(ModelError::Tokenizer(format!("vocab_size {vocab_size} out of range")));
        }
        // Each token needs at least MIN_TOKEN_LEN bytes; bail before allocating
        // for a count the section cannot hold.
        if vocab_size as u64 * MIN_TOKEN_LEN > length {
            return Err(ModelError::Tokenizer(format!(
                "vocab_size {vocab_size} cannot fit in {length} bytes"
            )));
        }
        let special = SpecialTokens {
            bos: magic.read_i32_field()?,
            eos: magic.read_i32_field()?,
            pad: magic.read_i32_field()?,
            unk: magic.read_i32_field()?,
        };

        let mut tokens = Vec::with_capacity(vocab_size as usize);
        for id in 0..vocab_size {
            let data = magic.read_string_field()?;
            let score = magic.read_f32_field()?;
            let raw_type = magic.read_i32_field()?;
            let token_type = TokenType::from_i32(raw_type).ok_or_else(|| {
                ModelError::Tokenizer(format!("token {id} has unknown type {raw_type}"))
            })?;
            tokens.push(Token { data, score, token_type });
        }
        debug!(vocab_size, "decoded vocabulary");
        Self::new(tokens, special)
    }
}
