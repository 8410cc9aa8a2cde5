// Canned generation tasks
//
// Each task owns a prompt template and its token budget. Sampling
// settings beyond temperature are shared by all tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dataset::prepare::INST_CLOSE;

/// Sampling parameters passed to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub temperature: f64,
    /// Nucleus sampling threshold
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.95,
            repetition_penalty: 1.2,
            do_sample: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Summary,
    Notes,
    #[serde(rename = "qna")]
    QnA,
    Cheatsheet,
}

impl Task {
    pub const ALL: [Task; 4] = [Task::Summary, Task::Notes, Task::QnA, Task::Cheatsheet];

    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            Task::Summary => "Summary",
            Task::Notes => "Notes",
            Task::QnA => "Q&A",
            Task::Cheatsheet => "Cheatsheet",
        }
    }

    pub fn prompt(&self, topic: &str) -> String {
        let body = match self {
            Task::Summary => format!("Provide a detailed summary (around 200 words) of {}", topic),
            Task::Notes => format!(
                "Provide concise notes in 5-6 bullet points for {}. Start each point with a dash (-)",
                topic
            ),
            Task::QnA => format!("Generate 1-2 line Q&A for {}", topic),
            Task::Cheatsheet => format!(
                "Create a cheatsheet for {} with important keywords and key points",
                topic
            ),
        };
        format!("<s>[INST] {} {}", body, INST_CLOSE)
    }

    pub fn max_new_tokens(&self) -> usize {
        match self {
            Task::Summary => 350,
            Task::Notes => 280,
            Task::QnA => 120,
            Task::Cheatsheet => 300,
        }
    }

    pub fn temperature(&self) -> f64 {
        match self {
            Task::QnA => 0.6,
            _ => 0.7,
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens(),
            temperature: self.temperature(),
            ..GenerationParams::default()
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(Task::Summary),
            "notes" => Ok(Task::Notes),
            "qna" | "q&a" => Ok(Task::QnA),
            "cheatsheet" => Ok(Task::Cheatsheet),
            other => Err(format!(
                "unknown task '{}' (expected summary, notes, qna or cheatsheet)",
                other
            )),
        }
    }
}

/// Strip the echoed prompt from decoded model output
///
/// Everything up to and including the first `[/INST]` is dropped.
pub fn extract_response(decoded: &str) -> String {
    match decoded.split_once(INST_CLOSE) {
        Some((_, response)) => response.trim().to_string(),
        None => decoded.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_prompts() {
        assert_eq!(
            Task::QnA.prompt("Transformers"),
            "<s>[INST] Generate 1-2 line Q&A for Transformers [/INST]"
        );
        assert_eq!(
            Task::Summary.prompt("GANs"),
            "<s>[INST] Provide a detailed summary (around 200 words) of GANs [/INST]"
        );
        assert!(Task::Notes.prompt("SVM").contains("bullet points for SVM. Start each point"));
    }

    #[test]
    fn test_task_params() {
        let qna = Task::QnA.params();
        assert_eq!(qna.max_new_tokens, 120);
        assert_eq!(qna.temperature, 0.6);
        assert_eq!(qna.top_p, 0.95);
        assert_eq!(qna.repetition_penalty, 1.2);
        assert!(qna.do_sample);

        assert_eq!(Task::Summary.params().max_new_tokens, 350);
        assert_eq!(Task::Cheatsheet.params().temperature, 0.7);
    }

    #[test]
    fn test_task_from_str() {
        assert_eq!("Q&A".parse::<Task>().unwrap(), Task::QnA);
        assert_eq!("qna".parse::<Task>().unwrap(), Task::QnA);
        assert_eq!(" Notes ".parse::<Task>().unwrap(), Task::Notes);
        assert!("quiz".parse::<Task>().is_err());
    }

    #[test]
    fn test_extract_response() {
        assert_eq!(
            extract_response("<s>[INST] prompt [/INST]  answer here \n"),
            "answer here"
        );
        assert_eq!(extract_response("  no marker  "), "no marker");
        assert_eq!(extract_response("a [/INST] b [/INST] c"), "b [/INST] c");
    }
}
