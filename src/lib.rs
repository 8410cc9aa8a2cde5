// NoteStop - study-note dataset preparation, fine-tuning and generation
// Library exports

pub mod config;
pub mod dataset; // Record normalization, cleaning and persistence
pub mod errors;
pub mod export;
pub mod generation; // Canned tasks over the fine-tuned model
pub mod training; // Fine-tuning configuration and external trainer
