// Fine-tuning subprocess
//
// Runs the external Python trainer on a prepared JSONL dataset and waits
// for it to finish. Trainer output goes to a log file next to the model.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::config::FineTuneConfig;
use crate::errors;

/// Python packages the trainer imports
const REQUIRED_PACKAGES: &str = "torch, transformers, peft, trl, bitsandbytes";

/// Record of one completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRun {
    /// Run ID (timestamp-based)
    pub id: String,
    pub dataset: PathBuf,
    pub model_dir: PathBuf,
    pub log_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Configuration the run was launched with
    pub config: FineTuneConfig,
}

/// `{model_dir}{suffix}` next to the model directory
///
/// Appends to the directory name, so dotted names such as `model-v1.1` keep
/// their own log and record.
fn sibling_path(model_dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = model_dir.file_name().with_context(|| {
        format!(
            "Model directory {} has no name to derive a sibling file from",
            model_dir.display()
        )
    })?;
    Ok(model_dir.with_file_name(format!("{}{}", name.to_string_lossy(), suffix)))
}

impl TrainingRun {
    /// Where the run record is persisted for a model directory
    pub fn record_path(model_dir: &Path) -> Result<PathBuf> {
        sibling_path(model_dir, ".run.json")
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::record_path(&self.model_dir)?;
        let json = serde_json::to_string_pretty(self).context("Failed to serialize training run")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write training run record: {}", path.display()))?;
        Ok(path)
    }

    pub fn load(model_dir: &Path) -> Result<Self> {
        let path = Self::record_path(model_dir)?;
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read training run record: {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to parse training run record")
    }
}

/// Anything that can fine-tune a model on a prepared dataset
#[async_trait]
pub trait TrainingService: Send + Sync {
    async fn train(&self, dataset: &Path, config: &FineTuneConfig) -> Result<TrainingRun>;
}

/// Trainer backed by a Python script
#[derive(Debug, Clone)]
pub struct SubprocessTrainer {
    /// Interpreter used to run the script
    python: PathBuf,
    script_path: PathBuf,
}

impl SubprocessTrainer {
    pub fn new(python: impl Into<PathBuf>, script_path: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script_path: script_path.into(),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Log file for a model directory
    pub fn log_path(model_dir: &Path) -> Result<PathBuf> {
        sibling_path(model_dir, ".training.log")
    }

    /// Script arguments: positional dataset and model dir, then one flag per hyperparameter
    pub fn build_args(&self, dataset: &Path, config: &FineTuneConfig) -> Vec<String> {
        let q = &config.quantization;
        let lora = &config.lora;
        let t = &config.trainer;

        let mut args = vec![
            dataset.display().to_string(),
            t.final_model_dir.display().to_string(),
            "--base-model".to_string(),
            config.base_model.clone(),
        ];

        if q.load_in_4bit {
            args.push("--load-in-4bit".to_string());
        }
        if q.double_quant {
            args.push("--double-quant".to_string());
        }

        let pairs: [(&str, String); 15] = [
            ("--compute-dtype", q.compute_dtype.clone()),
            ("--quant-type", q.quant_type.clone()),
            ("--rank", lora.rank.to_string()),
            ("--alpha", lora.alpha.to_string()),
            ("--dropout", lora.dropout.to_string()),
            ("--bias", lora.bias.clone()),
            ("--task-type", lora.task_type.clone()),
            ("--output-dir", t.output_dir.display().to_string()),
            ("--batch-size", t.batch_size.to_string()),
            ("--grad-accum", t.gradient_accumulation_steps.to_string()),
            ("--epochs", t.epochs.to_string()),
            ("--learning-rate", t.learning_rate.to_string()),
            ("--save-steps", t.save_steps.to_string()),
            ("--logging-steps", t.logging_steps.to_string()),
            ("--save-total-limit", t.save_total_limit.to_string()),
        ];
        for (flag, value) in pairs {
            args.push(flag.to_string());
            args.push(value);
        }

        args.push("--report-to".to_string());
        args.push(t.report_to.clone());

        if t.fp16 {
            args.push("--fp16".to_string());
        }

        args
    }

    /// Check that the interpreter can import the training stack
    pub async fn check_dependencies(&self) -> Result<bool> {
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(format!("import {}; print('OK')", REQUIRED_PACKAGES))
            .output()
            .await
            .with_context(|| errors::python_not_found_error(&self.python.display().to_string()))?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(stdout.trim() == "OK")
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl TrainingService for SubprocessTrainer {
    async fn train(&self, dataset: &Path, config: &FineTuneConfig) -> Result<TrainingRun> {
        // Validate inputs
        config.validate().context("Invalid fine-tuning configuration")?;

        if !dataset.exists() {
            anyhow::bail!(errors::dataset_not_found_error(&dataset.display().to_string()));
        }

        if !self.script_path.exists() {
            anyhow::bail!(errors::training_script_not_found_error(
                &self.script_path.display().to_string()
            ));
        }

        let model_dir = config.trainer.final_model_dir.clone();
        let log_path = Self::log_path(&model_dir)?;
        if let Some(parent) = model_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let log_file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create training log file: {}", log_path.display()))?;

        let started_at = Utc::now();
        let id = started_at.format("%Y%m%d_%H%M%S").to_string();

        tracing::info!(
            run_id = %id,
            dataset = %dataset.display(),
            model_dir = %model_dir.display(),
            base_model = %config.base_model,
            rank = config.lora.rank,
            epochs = config.trainer.epochs,
            effective_batch = config.effective_batch_size(),
            "Starting fine-tuning subprocess"
        );
        tracing::info!("Training logs will be written to: {}", log_path.display());

        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script_path)
            .args(self.build_args(dataset, config))
            .stdout(Stdio::from(
                log_file.try_clone().context("Failed to clone log file handle")?,
            ))
            .stderr(Stdio::from(log_file));

        let mut child = cmd
            .spawn()
            .with_context(|| errors::python_not_found_error(&self.python.display().to_string()))?;

        tracing::debug!(pid = ?child.id(), "Training subprocess spawned");

        let status = child
            .wait()
            .await
            .context("Failed to wait for training subprocess")?;

        if !status.success() {
            tracing::error!(?status, log = %log_path.display(), "Fine-tuning failed");
            anyhow::bail!(
                "Training failed with status {}. Check log: {}",
                status,
                log_path.display()
            );
        }

        let run = TrainingRun {
            id,
            dataset: dataset.to_path_buf(),
            model_dir,
            log_path,
            started_at,
            finished_at: Utc::now(),
            config: config.clone(),
        };

        let record = run.save()?;
        tracing::info!(
            run_id = %run.id,
            secs = (run.finished_at - run.started_at).num_seconds(),
            record = %record.display(),
            "Fine-tuning completed"
        );

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_build_args_carries_hyperparameters() {
        let trainer = SubprocessTrainer::new("python3", "scripts/train_sft.py");
        let config = FineTuneConfig::default();
        let args = trainer.build_args(Path::new("data/train.jsonl"), &config);

        assert_eq!(args[0], "data/train.jsonl");
        assert_eq!(args[1], "./tinyllama-trained");
        assert_eq!(flag_value(&args, "--base-model"), Some("TinyLlama/TinyLlama-1.1B-Chat-v1.0"));
        assert_eq!(flag_value(&args, "--rank"), Some("8"));
        assert_eq!(flag_value(&args, "--batch-size"), Some("2"));
        assert_eq!(flag_value(&args, "--grad-accum"), Some("4"));
        assert_eq!(flag_value(&args, "--learning-rate"), Some("0.0002"));
        assert_eq!(flag_value(&args, "--quant-type"), Some("nf4"));
        assert!(args.contains(&"--load-in-4bit".to_string()));
        assert!(args.contains(&"--fp16".to_string()));
    }

    #[test]
    fn test_build_args_omits_disabled_flags() {
        let trainer = SubprocessTrainer::new("python3", "train.py");
        let mut config = FineTuneConfig::default();
        config.quantization.load_in_4bit = false;
        config.quantization.double_quant = false;
        config.trainer.fp16 = false;

        let args = trainer.build_args(Path::new("d.jsonl"), &config);
        assert!(!args.contains(&"--load-in-4bit".to_string()));
        assert!(!args.contains(&"--double-quant".to_string()));
        assert!(!args.contains(&"--fp16".to_string()));
    }

    #[test]
    fn test_log_and_record_paths() {
        let dir = Path::new("out/tinyllama-trained");
        assert_eq!(
            SubprocessTrainer::log_path(dir).unwrap(),
            PathBuf::from("out/tinyllama-trained.training.log")
        );
        assert_eq!(
            TrainingRun::record_path(dir).unwrap(),
            PathBuf::from("out/tinyllama-trained.run.json")
        );
    }

    #[test]
    fn test_dotted_model_dirs_keep_separate_files() {
        let v1 = Path::new("models/tinyllama-v1.1");
        let v2 = Path::new("models/tinyllama-v1.2");

        assert_eq!(
            SubprocessTrainer::log_path(v1).unwrap(),
            PathBuf::from("models/tinyllama-v1.1.training.log")
        );
        assert_ne!(
            SubprocessTrainer::log_path(v1).unwrap(),
            SubprocessTrainer::log_path(v2).unwrap()
        );
        assert_eq!(
            TrainingRun::record_path(v2).unwrap(),
            PathBuf::from("models/tinyllama-v1.2.run.json")
        );
    }

    #[test]
    fn test_model_dir_without_name_is_rejected() {
        assert!(SubprocessTrainer::log_path(Path::new(".")).is_err());
        assert!(TrainingRun::record_path(Path::new("models/..")).is_err());
    }

    #[tokio::test]
    async fn test_train_requires_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = SubprocessTrainer::new("python3", dir.path().join("train.py"));
        let err = trainer
            .train(&dir.path().join("missing.jsonl"), &FineTuneConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.jsonl"));
    }

    #[tokio::test]
    async fn test_train_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = SubprocessTrainer::new("python3", dir.path().join("train.py"));
        let mut config = FineTuneConfig::default();
        config.trainer.epochs = 0;

        assert!(trainer.train(Path::new("any.jsonl"), &config).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_dependencies_false_without_training_stack() {
        // `sh -c "import ..."` exits non-zero
        let trainer = SubprocessTrainer::new("sh", "train.py");
        assert!(!trainer.check_dependencies().await.unwrap());
    }

    #[tokio::test]
    async fn test_check_dependencies_missing_interpreter() {
        let trainer = SubprocessTrainer::new("/nonexistent/python3", "train.py");
        let err = trainer.check_dependencies().await.unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/python3"));
    }
}
