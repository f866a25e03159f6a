//! General section: provenance strings.

use std::io::{Read, Seek, Write};

use alt_format::field::string_len;
use alt_format::{MagicFile, SectionKind};
use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::section::Section;

/// Seven strings, stored in declaration order. None may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct General {
    pub model_type: String,
    pub model_base: String,
    pub author: String,
    pub created_at: String,
    pub last_modified: String,
    pub license: String,
    pub uuid: String,
}

impl General {
    /// `(name, value)` pairs in on-disk order.
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("model_type", self.model_type.as_str()),
            ("model_base", self.model_base.as_str()),
            ("author", self.author.as_str()),
            ("created_at", self.created_at.as_str()),
            ("last_modified", self.last_modified.as_str()),
            ("license", self.license.as_str()),
            ("uuid", self.uuid.as_str()),
        ]
    }
}

impl Section for General {
    const KIND: SectionKind = SectionKind::General;

    fn encoded_len(&self) -> u64 {
        self.fields().iter().map(|(_, v)| string_len(v)).sum()
    }

    fn validate(&self) -> Result<()> {
        match self.fields().iter().find(|(_, v)| v.is_empty()) {
            Some((name, _)) => Err(ModelError::General(format!("{name} is empty"))),
            None => Ok(()),
        }
    }

    fn write_payload<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        for (_, value) in self.fields() {
            magic.write_string_field(value)?;
        }
        Ok(())
    }

    fn read_payload<S: Read + Write + Seek>(magic: &mut MagicFile<S>, _length: u64) -> Result<Self> {
        Ok(Self {
            model_type: magic.read_string_field()?,
            model_base: magic.read_string_field()?,
            author: magic.read_string_field()?,
            created_at: magic.read_string_field()?,
            last_modified: magic.read_string_field()?,
            license: magic.read_string_field()?,
            uuid: magic.read_string_field()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alt_format::Mode;
    use std::io::Cursor;

    fn sample() -> General {
        General {
            model_type: "mistral".into(),
            model_base: "mistralai/Mistral-7B-v0.1".into(),
            author: "Mistral AI".into(),
            created_at: "2023-09-27".into(),
            last_modified: "2024-01-10".into(),
            license: "Apache-2.0".into(),
            uuid: "5f0c7c9e-3c1b-4d6e-9a8f-2b7e1d4c6a90".into(),
        }
    }

    #[test]
    fn encoded_len_counts_prefixes() {
        let g = sample();
        let expected: u64 = g.fields().iter().map(|(_, v)| 4 + v.len() as u64).sum();
        assert_eq!(g.encoded_len(), expected);
    }

    #[test]
    fn section_round_trip() {
        let g = sample();
        let mut w = MagicFile::from_stream(Cursor::new(Vec::new()), Mode::Write);
        g.write_to(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();

        let mut r = MagicFile::from_stream(Cursor::new(bytes), Mode::Read);
        assert_eq!(General::read_from(&mut r).unwrap(), g);
    }

    #[test]
    fn empty_field_rejected_before_writing() {
        let mut g = sample();
        g.license.clear();
        let err = g.validate().unwrap_err();
        assert!(matches!(err, ModelError::General(ref m) if m.contains("license")));
    }
}
