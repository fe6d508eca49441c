use std::path::Path;

use anyhow::{Context, Result};
use escr_script::{OpcodeTable, UserOpcode};
use serde::{Deserialize, Serialize};

/// A game's user-opcode table as stored on disk.
///
/// ```yaml
/// opcodes:
///   - name: MES
///     params: -1
///   - name: WAIT
///     params: 1
/// ```
///
/// Entry `i` describes opcode `33 + i`. TOML files with the same shape are accepted
/// when the extension is `.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OpcodeConfig {
    #[serde(default)]
    pub opcodes: Vec<UserOpcode>,
}

impl OpcodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&text).with_context(|| format!("parse {:?}", path))
        } else {
            Self::from_yaml(&text).with_context(|| format!("parse {:?}", path))
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn into_table(self) -> OpcodeTable {
        OpcodeTable::new(self.opcodes)
    }
}
