// Training module - fine-tuning configuration and the external trainer

pub mod config;
pub mod subprocess;

pub use config::{FineTuneConfig, LoRAConfig, QuantizationConfig, TrainerArgs};
pub use subprocess::{SubprocessTrainer, TrainingRun, TrainingService};
