// Export of generated notes to plain text or Markdown

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::generation::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
}

impl ExportFormat {
    /// `.md` / `.markdown` export as Markdown, anything else as plain text
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => ExportFormat::Markdown,
            _ => ExportFormat::Text,
        }
    }
}

/// Render generated text for export
pub fn render(format: ExportFormat, task: Task, topic: &str, text: &str) -> String {
    let text = text.trim();
    match format {
        ExportFormat::Text => format!("{}\n", text),
        ExportFormat::Markdown => format!("# {}: {}\n\n{}\n", task.title(), topic.trim(), text),
    }
}

/// Write generated text to `path`, overwriting it
pub fn export(path: &Path, task: Task, topic: &str, text: &str) -> Result<ExportFormat> {
    if text.trim().is_empty() {
        anyhow::bail!("Nothing to export.");
    }

    let format = ExportFormat::from_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(path, render(format, task, topic, text))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), ?format, "Exported");
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.md")), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_path(Path::new("a.MD")), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_path(Path::new("a.txt")), ExportFormat::Text);
        assert_eq!(ExportFormat::from_path(Path::new("notes")), ExportFormat::Text);
    }

    #[test]
    fn test_markdown_heading() {
        let rendered = render(ExportFormat::Markdown, Task::QnA, " RNN ", "Q: ...\nA: ...");
        assert_eq!(rendered, "# Q&A: RNN\n\nQ: ...\nA: ...\n");
    }

    #[test]
    fn test_export_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");

        export(&path, Task::Notes, "SVM", "old").unwrap();
        let format = export(&path, Task::Notes, "SVM", "- margin\n- kernels").unwrap();

        assert_eq!(format, ExportFormat::Markdown);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Notes: SVM\n\n- margin\n- kernels\n"
        );
    }

    #[test]
    fn test_export_refuses_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        let err = export(&path, Task::Summary, "X", "  \n ").unwrap_err();
        assert!(err.to_string().contains("Nothing to export"));
        assert!(!path.exists());
    }
}
