//! Decoder configuration files.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parameters for building a decoder and loading its training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub classifier: String,
    pub scoring: String,
    pub balancing: Option<String>,
    pub optimize: bool,
    pub seed: Option<u64>,
    /// Column holding class labels when reading a CSV table.
    pub label_column: String,
    /// Column holding group ids when reading a CSV table.
    pub group_column: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            classifier: "lda".to_string(),
            scoring: "balanced_accuracy".to_string(),
            balancing: None,
            optimize: false,
            seed: None,
            label_column: "label".to_string(),
            group_column: "group".to_string(),
        }
    }
}

/// Load a decoder configuration from a JSON file.
pub fn load_decoder_config<P: AsRef<Path>>(path: P) -> Result<DecoderConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: DecoderConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    log::debug!("Loaded decoder config {:?}", config);
    Ok(config)
}
