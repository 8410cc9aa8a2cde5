// Fine-tuning hyperparameters
//
// Everything the external trainer needs: base model, 4-bit quantization,
// LoRA adapter and trainer arguments. Loaded from the `[finetune]` table
// of the config file; every field has a default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigError;

/// 4-bit quantized loading of the base model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    pub load_in_4bit: bool,
    /// Dtype used for compute on dequantized weights
    pub compute_dtype: String,
    /// Quantize the quantization constants as well
    pub double_quant: bool,
    /// "nf4" or "fp4"
    pub quant_type: String,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            load_in_4bit: true,
            compute_dtype: "float16".to_string(),
            double_quant: true,
            quant_type: "nf4".to_string(),
        }
    }
}

/// LoRA adapter configuration
///
/// LoRA fine-tunes a frozen model by learning low-rank updates to its
/// weight matrices. Only the adapter is trained.
///
/// # References
/// - Paper: "LoRA: Low-Rank Adaptation of Large Language Models" (Hu et al., 2021)
/// - https://arxiv.org/abs/2106.09685
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoRAConfig {
    /// Rank of the low-rank decomposition (typically 4-64)
    pub rank: usize,

    /// Scaling factor for LoRA updates
    ///
    /// Common practice: alpha = 2 * rank
    pub alpha: f64,

    /// Dropout rate for LoRA layers, in [0, 1)
    pub dropout: f64,

    /// Which biases to train ("none", "all", "lora_only")
    pub bias: String,

    pub task_type: String,
}

impl Default for LoRAConfig {
    fn default() -> Self {
        Self {
            rank: 8,
            alpha: 16.0,
            dropout: 0.05,
            bias: "none".to_string(),
            task_type: "CAUSAL_LM".to_string(),
        }
    }
}

/// Supervised fine-tuning trainer arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerArgs {
    /// Intermediate checkpoints
    pub output_dir: PathBuf,
    /// Where the final model and tokenizer are saved
    pub final_model_dir: PathBuf,
    pub batch_size: usize,
    pub gradient_accumulation_steps: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub fp16: bool,
    pub save_steps: usize,
    pub logging_steps: usize,
    pub save_total_limit: usize,
    pub report_to: String,
}

impl Default for TrainerArgs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./tinyllama-finetuned"),
            final_model_dir: PathBuf::from("./tinyllama-trained"),
            batch_size: 2,
            gradient_accumulation_steps: 4,
            epochs: 3,
            learning_rate: 2e-4,
            fp16: true,
            save_steps: 100,
            logging_steps: 10,
            save_total_limit: 2,
            report_to: "none".to_string(),
        }
    }
}

/// Complete fine-tuning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneConfig {
    /// Base model name or path
    pub base_model: String,
    pub quantization: QuantizationConfig,
    pub lora: LoRAConfig,
    pub trainer: TrainerArgs,
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            base_model: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            quantization: QuantizationConfig::default(),
            lora: LoRAConfig::default(),
            trainer: TrainerArgs::default(),
        }
    }
}

impl FineTuneConfig {
    /// Examples per optimizer step
    pub fn effective_batch_size(&self) -> usize {
        self.trainer.batch_size * self.trainer.gradient_accumulation_steps
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.into(),
            }
        }

        if self.base_model.trim().is_empty() {
            return Err(invalid("base_model", "must not be empty"));
        }
        if self.lora.rank == 0 {
            return Err(invalid("lora.rank", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.lora.dropout) {
            return Err(invalid("lora.dropout", format!("{} not in [0, 1)", self.lora.dropout)));
        }
        if !matches!(self.quantization.quant_type.as_str(), "nf4" | "fp4") {
            return Err(invalid(
                "quantization.quant_type",
                format!("unknown type '{}' (expected nf4 or fp4)", self.quantization.quant_type),
            ));
        }
        if self.trainer.batch_size == 0 {
            return Err(invalid("trainer.batch_size", "must be at least 1"));
        }
        if self.trainer.gradient_accumulation_steps == 0 {
            return Err(invalid("trainer.gradient_accumulation_steps", "must be at least 1"));
        }
        if self.trainer.epochs == 0 {
            return Err(invalid("trainer.epochs", "must be at least 1"));
        }
        if !self.trainer.learning_rate.is_finite() || self.trainer.learning_rate <= 0.0 {
            return Err(invalid(
                "trainer.learning_rate",
                format!("{} is not a positive number", self.trainer.learning_rate),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FineTuneConfig::default();
        assert_eq!(config.lora.rank, 8);
        assert_eq!(config.lora.alpha, 16.0);
        assert_eq!(config.quantization.quant_type, "nf4");
        assert_eq!(config.trainer.epochs, 3);
        assert_eq!(config.effective_batch_size(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = FineTuneConfig::default();
        config.lora.rank = 0;
        assert!(config.validate().is_err());

        let mut config = FineTuneConfig::default();
        config.lora.dropout = 1.0;
        assert!(config.validate().is_err());

        let mut config = FineTuneConfig::default();
        config.trainer.learning_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = FineTuneConfig::default();
        config.quantization.quant_type = "int8".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quant_type"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FineTuneConfig = toml::from_str(
            r#"
            base_model = "local/model"

            [lora]
            rank = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.base_model, "local/model");
        assert_eq!(config.lora.rank, 16);
        assert_eq!(config.lora.alpha, 16.0);
        assert_eq!(config.trainer.batch_size, 2);
    }
}
