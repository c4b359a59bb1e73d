// File: src/config.rs
// Purpose: Configuration parsing from form-bridge.toml

use crate::decoder::{DEFAULT_MAX_INDEX, DEFAULT_MAX_PADDING};
use crate::errors::AllowedKeys;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

/// How flat entries are turned into nested values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Keep text values as strings instead of decoding JSON literals
    #[serde(default = "default_false")]
    pub preserve_stringified: bool,

    /// Trim whitespace around text values
    #[serde(default = "default_false")]
    pub trim_values: bool,

    /// Highest array index accepted in a dotted key path
    #[serde(default = "default_max_index")]
    pub max_index: usize,

    /// Null slots one decode may add when indices skip ahead
    #[serde(default = "default_max_padding")]
    pub max_padding: usize,
}

/// Validation pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// Validate an empty object instead of aborting when decoding fails
    #[serde(default = "default_false")]
    pub lenient_decoding: bool,
}

/// Error merge behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeConfig {
    /// Top-level keys accepted from secondary error trees (empty accepts all)
    #[serde(default)]
    pub allowed_keys: Vec<String>,
}

fn default_false() -> bool {
    false
}

fn default_max_index() -> usize {
    DEFAULT_MAX_INDEX
}

fn default_max_padding() -> usize {
    DEFAULT_MAX_PADDING
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            preserve_stringified: false,
            trim_values: false,
            max_index: default_max_index(),
            max_padding: default_max_padding(),
        }
    }
}

impl MergeConfig {
    pub fn allowed(&self) -> AllowedKeys {
        AllowedKeys::new(self.allowed_keys.iter().cloned())
    }
}

impl BridgeConfig {
    /// Load and check `form-bridge.toml`; a missing or blank file gives defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read form-bridge config: {:?}", path))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid form-bridge config: {:?}", path))
    }

    /// Load from ./form-bridge.toml
    pub fn load_default() -> Result<Self> {
        Self::load("form-bridge.toml")
    }

    /// Parse and check configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: BridgeConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the decoder or merger cannot honour
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.decoder.max_index > 0,
            "[decoder] max_index must be at least 1"
        );

        // Filtering applies to top-level fields only
        for key in &self.merge.allowed_keys {
            if key.is_empty() || key.contains('.') || key.contains('[') {
                bail!("[merge] allowed_keys entry {:?} is not a top-level field name", key);
            }
        }
        Ok(())
    }
}
