//! Pipeline Configuration Module
//! Settings shared by loading, cleaning and the named views.

use crate::data::{ImputationRules, LoadOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    Delimiter(char),
}

/// Pipeline settings, loadable from JSON. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub delimiter: char,
    /// Rows shown in the data preview.
    pub preview_rows: usize,
    /// Length of the top-N revenue rankings.
    pub top_n: usize,
    /// Establishment year used by the per-year category view.
    pub focus_year: i32,
    pub outlet_size_fill: String,
    /// Treat a view whose filter matches no rows as an error.
    pub strict_empty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            preview_rows: 15,
            top_n: 12,
            focus_year: 1985,
            outlet_size_fill: "Medium".to_string(),
            strict_empty: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.load_options()?;
        Ok(config)
    }

    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::Delimiter(self.delimiter));
        }
        Ok(LoadOptions {
            delimiter: self.delimiter as u8,
        })
    }

    pub fn imputation_rules(&self) -> ImputationRules {
        ImputationRules {
            outlet_size_fill: self.outlet_size_fill.clone(),
        }
    }
}
