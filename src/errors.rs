// User-friendly error messages
//
// Provides helpers to convert technical errors into actionable messages
// that guide users toward solutions.

use anyhow::{Context, Result};
use std::fmt;

/// Wrap an error with user-friendly context
pub trait UserFriendlyError {
    /// Add user-friendly context to this error
    fn user_context(self, message: &str) -> Self;

    /// Add user-friendly context with a suggestion
    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self;
}

impl<T> UserFriendlyError for Result<T> {
    fn user_context(self, message: &str) -> Self {
        self.with_context(|| message.to_string())
    }

    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self {
        self.with_context(|| wrap_error_with_suggestion(problem, suggestion))
    }
}

/// Format a missing dataset file error
pub fn dataset_not_found_error(path: &str) -> String {
    format!(
        "Dataset not found: {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • Wrong path specified\n\
        • Previous pipeline step was not run\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the file exists:\n\
           \x1b[36mls -la {}\x1b[0m\n\n\
        2. Run the pipeline in order:\n\
           \x1b[36mnotestop format\x1b[0m → \x1b[36mnotestop prepare\x1b[0m → \x1b[36mnotestop train\x1b[0m",
        path, path
    )
}

/// Format a dataset parse error
pub fn dataset_parse_error(path: &str, error: &str) -> String {
    format!(
        "Failed to parse dataset {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Raw datasets must be a JSON array of objects:\n\
           \x1b[36m[{{\"instruction\": \"Topic\", \"response\": {{\"summary\": \"...\"}}}}]\x1b[0m\n\n\
        2. Prepared datasets are JSONL, one {{\"text\": ...}} object per line",
        path, error
    )
}

/// Format a model not found error with helpful suggestions
pub fn model_not_found_error(model_path: &str) -> String {
    format!(
        "Fine-tuned model not found: {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • Model has not been trained yet\n\
        • Training failed before saving\n\
        • Wrong model path in config\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Train the model:\n\
           \x1b[36mnotestop train\x1b[0m\n\n\
        2. Point at an existing model:\n\
           \x1b[36mnotestop generate --model <dir> ...\x1b[0m\n\n\
        3. Verify model path in config:\n\
           \x1b[36mcat ~/.notestop/config.toml\x1b[0m",
        model_path
    )
}

/// Format a missing training script error
pub fn training_script_not_found_error(path: &str) -> String {
    format!(
        "Training script not found: {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Run from the project root directory\n\n\
        2. Set the script location in config:\n\
           \x1b[36m[training]\n\
           train_script = \"/path/to/train_sft.py\"\x1b[0m",
        path
    )
}

/// Format a Python interpreter failure
pub fn python_not_found_error(python: &str) -> String {
    format!(
        "Failed to run Python interpreter '{}'\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • Python 3 is not installed\n\
        • Interpreter path in config is wrong\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the interpreter:\n\
           \x1b[36m{} --version\x1b[0m\n\n\
        2. Install the training stack:\n\
           \x1b[36mpip install torch transformers peft trl bitsandbytes\x1b[0m",
        python, python
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(path: &str) -> String {
    format!(
        "Failed to load config file {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat {}\x1b[0m\n\n\
        2. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Unclosed brackets []\n\
           • Numbers where paths are expected",
        path, path
    )
}

/// Format a file not found error with helpful suggestions
pub fn file_not_found_error(path: &str, description: &str) -> String {
    format!(
        "{} not found: {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • File has been deleted\n\
        • Wrong path specified\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check if file exists:\n\
           \x1b[36mls -la {}\x1b[0m",
        description, path, path
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!("{}\n\n\x1b[1;33mSuggestion:\x1b[0m {}", error, suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_not_found_mentions_pipeline() {
        let msg = dataset_not_found_error("data/raw.json");
        assert!(msg.contains("data/raw.json"));
        assert!(msg.contains("notestop format"));
    }

    #[test]
    fn test_model_not_found_has_train_suggestion() {
        let msg = model_not_found_error("./tinyllama-trained");
        assert!(msg.contains("./tinyllama-trained"));
        assert!(msg.contains("notestop train"));
    }

    #[test]
    fn test_user_context_with_suggestion() {
        let result: Result<()> = Err(anyhow::anyhow!("boom"));
        let err = result
            .user_context_with_suggestion("Export failed", "choose another path")
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Export failed"));
        assert!(msg.contains("choose another path"));
        assert!(msg.contains("boom"));
    }
}
