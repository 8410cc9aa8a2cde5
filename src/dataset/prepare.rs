// Training data preparation
//
// Cleans formatted pairs before fine-tuning and wraps each one in the
// instruction prompt template the model is trained on.

use serde::Deserialize;
use serde_json::Value;

use super::pair::{InstructionPair, TrainingText};

/// Prompt template markers
pub const BOS: &str = "<s>";
pub const EOS: &str = "</s>";
pub const INST_OPEN: &str = "[INST]";
pub const INST_CLOSE: &str = "[/INST]";

/// A pair as found on disk before cleaning
///
/// `output` may be a string or a list of strings / `{"point": ...}` objects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPair {
    #[serde(default)]
    pub instruction: Value,
    #[serde(default)]
    pub output: Value,
}

impl From<&InstructionPair> for RawPair {
    fn from(pair: &InstructionPair) -> Self {
        Self {
            instruction: Value::String(pair.instruction.clone()),
            output: Value::String(pair.output.clone()),
        }
    }
}

/// Result of cleaning a pair collection
#[derive(Debug, Clone, Default)]
pub struct Cleaned {
    pub pairs: Vec<InstructionPair>,
    /// Pairs dropped for an empty instruction or output
    pub discarded: usize,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn output_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("point") {
                Some(point) => value_text(point),
                _ => value_text(item),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => value_text(other),
    }
}

/// Clean a single pair, `None` when either side ends up empty
pub fn clean_pair(raw: &RawPair) -> Option<InstructionPair> {
    let instruction = value_text(&raw.instruction).trim().to_string();
    let output = output_text(&raw.output).trim().to_string();

    if instruction.is_empty() || output.is_empty() {
        return None;
    }
    Some(InstructionPair { instruction, output })
}

pub fn clean_pairs(raw: &[RawPair]) -> Cleaned {
    let pairs: Vec<InstructionPair> = raw.iter().filter_map(clean_pair).collect();
    Cleaned {
        discarded: raw.len() - pairs.len(),
        pairs,
    }
}

/// `<s>[INST] {instruction} [/INST] {output}</s>`
pub fn format_prompt(pair: &InstructionPair) -> String {
    format!(
        "{}{} {} {} {}{}",
        BOS, INST_OPEN, pair.instruction, INST_CLOSE, pair.output, EOS
    )
}

pub fn to_training_texts(pairs: &[InstructionPair]) -> Vec<TrainingText> {
    pairs
        .iter()
        .map(|pair| TrainingText {
            text: format_prompt(pair),
        })
        .collect()
}
