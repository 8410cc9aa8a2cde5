// Text generation against the fine-tuned model
//
// The model is owned by an explicitly constructed `ModelContext` that the
// caller holds for as long as it generates. Decoding itself runs in an
// external Python process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::tasks::{extract_response, GenerationParams, Task};
use crate::errors;

/// A loaded model artifact
#[derive(Debug, Clone)]
pub struct ModelContext {
    model_path: PathBuf,
}

impl ModelContext {
    /// Open a model directory produced by training
    pub fn open(model_path: impl Into<PathBuf>) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.is_dir() {
            anyhow::bail!(errors::model_not_found_error(&model_path.display().to_string()));
        }

        tracing::debug!(model = %model_path.display(), "Opened model context");
        Ok(Self { model_path })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// Anything that continues a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the decoded sequence (which may echo the prompt)
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Generator backed by a Python script
///
/// Invoked as `{python} {script} {model_dir} --prompt ... --max-new-tokens ...`;
/// the decoded text is read from stdout.
#[derive(Debug, Clone)]
pub struct SubprocessGenerator {
    context: ModelContext,
    python: PathBuf,
    script_path: PathBuf,
}

impl SubprocessGenerator {
    pub fn new(
        context: ModelContext,
        python: impl Into<PathBuf>,
        script_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            context,
            python: python.into(),
            script_path: script_path.into(),
        }
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn build_args(&self, prompt: &str, params: &GenerationParams) -> Vec<String> {
        let mut args = vec![
            self.context.model_path.display().to_string(),
            "--prompt".to_string(),
            prompt.to_string(),
            "--max-new-tokens".to_string(),
            params.max_new_tokens.to_string(),
            "--temperature".to_string(),
            params.temperature.to_string(),
            "--top-p".to_string(),
            params.top_p.to_string(),
            "--repetition-penalty".to_string(),
            params.repetition_penalty.to_string(),
        ];
        if params.do_sample {
            args.push("--do-sample".to_string());
        }
        args
    }
}

#[async_trait]
impl TextGenerator for SubprocessGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        if !self.script_path.exists() {
            anyhow::bail!(errors::file_not_found_error(
                &self.script_path.display().to_string(),
                "Generation script"
            ));
        }

        tracing::debug!(
            max_new_tokens = params.max_new_tokens,
            temperature = params.temperature,
            "Running generation subprocess"
        );

        let output = Command::new(&self.python)
            .arg(&self.script_path)
            .args(self.build_args(prompt, params))
            .output()
            .await
            .with_context(|| errors::python_not_found_error(&self.python.display().to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Generation failed with status {}: {}",
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Trimmed topic, or the user-facing warning when it is blank
pub fn require_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        anyhow::bail!("Please enter a topic and select a task.");
    }
    Ok(topic)
}

/// Run a canned task for a topic and return the cleaned response
pub async fn run_task<G>(generator: &G, task: Task, topic: &str) -> Result<String>
where
    G: TextGenerator + ?Sized,
{
    let topic = require_topic(topic)?;

    let prompt = task.prompt(topic);
    let params = task.params();

    tracing::info!(task = %task, topic = %topic, "Generating");
    let decoded = generator
        .generate(&prompt, &params)
        .await
        .with_context(|| format!("Failed to generate {} for '{}'", task, topic))?;

    Ok(extract_response(&decoded))
}
