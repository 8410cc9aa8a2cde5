// Integration tests for the external trainer and generator
//
// `sh` stands in for the Python interpreter so the subprocess contract can
// be exercised without the ML stack installed.
#![cfg(unix)]

use notestop::generation::{run_task, ModelContext, SubprocessGenerator, Task};
use notestop::training::{FineTuneConfig, SubprocessTrainer, TrainingRun, TrainingService};
use std::fs;
use std::path::Path;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("Failed to write script");
}

fn config_in(dir: &Path) -> FineTuneConfig {
    let mut config = FineTuneConfig::default();
    config.trainer.final_model_dir = dir.join("model");
    config.trainer.output_dir = dir.join("checkpoints");
    config
}

#[tokio::test]
async fn test_successful_training_run_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"<s>[INST] a [/INST] b</s>\"}\n").unwrap();

    let script = dir.path().join("train.sh");
    write_script(&script, "echo \"training on $1 into $2\"\nmkdir -p \"$2\"\n");

    let trainer = SubprocessTrainer::new("sh", &script);
    let config = config_in(dir.path());
    let run = trainer.train(&dataset, &config).await.expect("training should succeed");

    assert_eq!(run.model_dir, dir.path().join("model"));
    assert!(run.model_dir.is_dir());
    assert!(run.finished_at >= run.started_at);

    let log = fs::read_to_string(&run.log_path).unwrap();
    assert!(log.contains("training on"));

    let loaded = TrainingRun::load(&run.model_dir).unwrap();
    assert_eq!(loaded.id, run.id);
    assert_eq!(loaded.config, config);
}

#[tokio::test]
async fn test_failed_training_points_at_log() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"x\"}\n").unwrap();

    let script = dir.path().join("train.sh");
    write_script(&script, "echo 'CUDA out of memory' >&2\nexit 3\n");

    let trainer = SubprocessTrainer::new("sh", &script);
    let err = trainer
        .train(&dataset, &config_in(dir.path()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Check log"));
    let log = fs::read_to_string(SubprocessTrainer::log_path(&dir.path().join("model")).unwrap())
        .unwrap();
    assert!(log.contains("CUDA out of memory"));
}

#[tokio::test]
async fn test_dotted_model_dir_run_files_sit_beside_it() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"x\"}\n").unwrap();

    let script = dir.path().join("train.sh");
    write_script(&script, "mkdir -p \"$2\"\n");

    let mut config = config_in(dir.path());
    config.trainer.final_model_dir = dir.path().join("tinyllama-v1.1");

    let trainer = SubprocessTrainer::new("sh", &script);
    let run = trainer.train(&dataset, &config).await.unwrap();

    assert_eq!(run.log_path, dir.path().join("tinyllama-v1.1.training.log"));
    assert!(dir.path().join("tinyllama-v1.1.run.json").is_file());
    assert!(!dir.path().join("tinyllama-v1.run.json").exists());
}

#[tokio::test]
async fn test_missing_training_script() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("train.jsonl");
    fs::write(&dataset, "{\"text\": \"x\"}\n").unwrap();

    let trainer = SubprocessTrainer::new("sh", dir.path().join("absent.sh"));
    let err = trainer
        .train(&dataset, &config_in(dir.path()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Training script not found"));
}

#[tokio::test]
async fn test_generation_through_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("model");
    fs::create_dir(&model_dir).unwrap();

    // Echo a decoded sequence the way a causal LM returns it: prompt, then continuation
    let script = dir.path().join("generate.sh");
    write_script(
        &script,
        "echo \"<s>[INST] prompt [/INST]\"\necho \"- model dir $1\"\necho \"- tokens $5\"\n",
    );

    let context = ModelContext::open(&model_dir).unwrap();
    let generator = SubprocessGenerator::new(context, "sh", &script);

    let result = run_task(&generator, Task::Notes, "Backpropagation").await.unwrap();
    assert_eq!(
        result,
        format!("- model dir {}\n- tokens 280", model_dir.display())
    );
}

#[tokio::test]
async fn test_generation_failure_surfaces_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("generate.sh");
    write_script(&script, "echo 'tokenizer missing' >&2\nexit 1\n");

    let context = ModelContext::open(dir.path()).unwrap();
    let generator = SubprocessGenerator::new(context, "sh", &script);

    let err = run_task(&generator, Task::Summary, "GANs").await.unwrap_err();
    assert!(format!("{:#}", err).contains("tokenizer missing"));
}
