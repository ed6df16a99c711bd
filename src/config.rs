// Classifier configuration
//
// Everything tunable about a session in one serde struct, loadable from TOML.
// Command-line flags override whatever the file sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decision::DecisionThresholds;
use crate::error::{ClassifierError, Result};
use crate::features::NgramMode;
use crate::model::default_model_path;

/// Default block size for block-mode scanning
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Default chunk size for streaming whole inputs
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Tunables for classification sessions and scans
///
/// # Example
/// ```
/// use bytesift::config::ClassifierConfig;
///
/// let config = ClassifierConfig::from_toml_str(
///     r#"
///     block_size = 4096
///
///     [thresholds]
///     randomness = 0.99
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.block_size, 4096);
/// assert_eq!(config.thresholds.randomness, 0.99);
/// assert_eq!(config.thresholds.unigram_constant, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Which bigram tables and statistics are computed
    ///
    /// Must match the mode the model was trained with.
    pub ngram_mode: NgramMode,

    /// Bytes per unit in block mode, and the size of an omitted first block
    pub block_size: usize,

    /// Chunk size used when streaming a whole input
    pub read_buffer_size: usize,

    /// Model used when no model is given explicitly
    pub model_path: Option<PathBuf>,

    /// Override-rule thresholds
    pub thresholds: DecisionThresholds,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ngram_mode: NgramMode::DEFAULT,
            block_size: DEFAULT_BLOCK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            model_path: None,
            thresholds: DecisionThresholds::default(),
        }
    }
}

impl ClassifierConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ClassifierError::Config(e.to_string()))?;
        config.validate().map_err(ClassifierError::Config)?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ClassifierError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.thresholds.validate()?;

        if self.block_size == 0 {
            return Err("block_size must be > 0".to_string());
        }

        if self.read_buffer_size == 0 {
            return Err("read_buffer_size must be > 0".to_string());
        }

        Ok(())
    }

    /// Model path: configured, then `$BYTESIFT_MODEL`, then `model`
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(default_model_path)
    }
}
