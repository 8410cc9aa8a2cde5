// Configuration structs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::training::FineTuneConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to access config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Dataset file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    /// Raw topic records
    pub raw_path: PathBuf,
    /// Normalized instruction/output pairs
    pub formatted_path: PathBuf,
    /// Prompt-wrapped JSONL consumed by the trainer
    pub prepared_path: PathBuf,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("dataset.json"),
            formatted_path: PathBuf::from("formatted_dataset.json"),
            prepared_path: PathBuf::from("training_data.jsonl"),
        }
    }
}

/// External Python scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub python: PathBuf,
    pub train_script: PathBuf,
    pub generate_script: PathBuf,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            train_script: PathBuf::from("scripts/train_sft.py"),
            generate_script: PathBuf::from("scripts/generate.py"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Fine-tuned model directory
    pub model_path: PathBuf,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./tinyllama-trained"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetPaths,
    pub training: TrainingSettings,
    pub finetune: FineTuneConfig,
    pub generation: GenerationSettings,
}

impl Config {
    /// Write as TOML, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}
