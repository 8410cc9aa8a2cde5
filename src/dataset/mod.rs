// Dataset module - record normalization, cleaning and persistence

pub mod error;
pub mod io;
pub mod normalizer;
pub mod pair;
pub mod prepare;
pub mod record;

pub use error::DatasetError;
pub use normalizer::{normalize, normalize_record, NormalizeReport, Normalized};
pub use pair::{InstructionPair, TrainingText};
pub use prepare::{clean_pairs, format_prompt, to_training_texts, Cleaned, RawPair};
pub use record::{Field, FieldValue, Responses, TopicRecord};
