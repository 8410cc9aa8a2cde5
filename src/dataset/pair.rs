// Instruction/output pairs for supervised fine-tuning

use serde::{Deserialize, Serialize};

/// One supervised fine-tuning example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionPair {
    pub instruction: String,
    pub output: String,
}

impl InstructionPair {
    pub fn new(instruction: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            output: output.into(),
        }
    }
}

/// Prompt-wrapped training example, one line of the prepared JSONL file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingText {
    pub text: String,
}
