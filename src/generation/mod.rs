// Generation module - canned study-note tasks over the fine-tuned model

pub mod generator;
pub mod tasks;

pub use generator::{require_topic, run_task, ModelContext, SubprocessGenerator, TextGenerator};
pub use tasks::{extract_response, GenerationParams, Task};
