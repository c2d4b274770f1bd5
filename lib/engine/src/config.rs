//! Mapper configuration
//!
//! The engine consumes two plain values: which pretrained model to load and
//! the similarity threshold. Both arrive from an external settings file; the
//! engine owns only their validation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use attrmap_core::{Error, Result};

/// Configuration consumed by the resolution engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapperConfig {
    /// Identifier of the pretrained embedding model
    pub embedding_model: String,
    /// Minimum cosine similarity for an embedding match, in [0, 1]
    pub embedding_threshold: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-minilm-l6-v2".to_string(),
            embedding_threshold: 0.6,
        }
    }
}

impl MapperConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Serialization(format!("invalid JSON in {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "embedding_model must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.embedding_threshold) {
            return Err(Error::InvalidThreshold(self.embedding_threshold));
        }
        Ok(())
    }
}
