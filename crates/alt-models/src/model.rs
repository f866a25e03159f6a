//! Whole-model load and save.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use alt_common::AltConfig;
use alt_common::constants::{MAGIC_ALIGNMENT, MAGIC_VERSION};
use alt_format::{MagicFile, Mode};
use tracing::{debug, info};

use crate::error::Result;
use crate::general::General;
use crate::parameters::Parameters;
use crate::section::Section;
use crate::tensors::Tensors;
use crate::tokenizer::Tokenizer;

/// A complete ALT file: layout values plus the four sections, always written
/// and read in the order general, parameters, tokenizer, tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct AltModel {
    pub version: i32,
    pub alignment: i32,
    pub general: General,
    pub parameters: Parameters,
    pub tokenizer: Tokenizer,
    pub tensors: Tensors,
}

impl AltModel {
    pub fn new(
        general: General,
        parameters: Parameters,
        tokenizer: Tokenizer,
        tensors: Tensors,
    ) -> Self {
        Self {
            version: MAGIC_VERSION,
            alignment: MAGIC_ALIGNMENT,
            general,
            parameters,
            tokenizer,
            tensors,
        }
    }

    /// Take version and alignment from `config.format`.
    pub fn with_config(mut self, config: &AltConfig) -> Self {
        self.version = config.format.version;
        self.alignment = config.format.alignment;
        self
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut magic = MagicFile::<File>::open(path, Mode::Write)?;
        self.write_to(&mut magic)?;
        magic.close()?;
        info!(path = %path.display(), tensors = self.tensors.len(), "saved model");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut magic = MagicFile::<File>::open(path, Mode::Read)?;
        magic.validate()?;
        let model = Self::read_from(&mut magic)?;
        magic.close()?;
        info!(path = %path.display(), tensors = model.tensors.len(), "loaded model");
        Ok(model)
    }

    pub fn write_to<S: Read + Write + Seek>(&self, magic: &mut MagicFile<S>) -> Result<()> {
        magic.write_start_marker(self.version, self.alignment)?;
        self.general.write_to(magic)?;
        self.parameters.write_to(magic)?;
        self.tokenizer.write_to(magic)?;
        self.tensors.write_to(magic)?;
        magic.write_end_marker()?;
        debug!(end = magic.position()?, "model written");
        Ok(())
    }

    pub fn read_from<S: Read + Write + Seek>(magic: &mut MagicFile<S>) -> Result<Self> {
        let start = magic.read_start_marker()?;
        let general = General::read_from(magic)?;
        let parameters = Parameters::read_from(magic)?;
        let tokenizer = Tokenizer::read_from(magic)?;
        let tensors = Tensors::read_from(magic)?;
        magic.read_end_marker()?;
        Ok(Self {
            version: start.version,
            alignment: start.alignment,
            general,
            parameters,
            tokenizer,
            tensors,
        })
    }
}
