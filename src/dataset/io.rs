// Dataset persistence
//
// Raw and formatted datasets are JSON arrays. The prepared training file
// is JSONL with one `{"text": ...}` object per line. Writers always
// truncate and overwrite.

use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::DatasetError;
use super::pair::{InstructionPair, TrainingText};
use super::prepare::RawPair;
use super::record::TopicRecord;

/// Read the raw topic record collection
pub fn read_records(path: &Path) -> Result<Vec<TopicRecord>, DatasetError> {
    read_json_array(path)
}

/// Read a formatted pair collection, strictly typed
pub fn read_pairs(path: &Path) -> Result<Vec<InstructionPair>, DatasetError> {
    read_json_array(path)
}

/// Read a pair collection whose `output` values may still be lists
pub fn read_raw_pairs(path: &Path) -> Result<Vec<RawPair>, DatasetError> {
    read_json_array(path)
}

/// Write the formatted pair collection as pretty-printed JSON
pub fn write_pairs(path: &Path, pairs: &[InstructionPair]) -> Result<(), DatasetError> {
    let json = to_pretty_json(pairs)?;
    write_file(path, json.as_bytes())
}

/// Write prepared training texts as JSONL
pub fn write_training_texts(path: &Path, texts: &[TrainingText]) -> Result<(), DatasetError> {
    ensure_parent(path)?;
    let file = fs::File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    for text in texts {
        serde_json::to_writer(&mut writer, text)?;
        writer.write_all(b"\n").map_err(|e| DatasetError::io(path, e))?;
    }

    writer.flush().map_err(|e| DatasetError::io(path, e))
}

/// Read prepared training texts from JSONL (blank lines skipped)
pub fn read_training_texts(path: &Path) -> Result<Vec<TrainingText>, DatasetError> {
    let contents = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })
        })
        .collect()
}

fn read_json_array<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let contents = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| DatasetError::parse(path, e))
}

/// Pretty JSON with 2-space indent; non-ASCII is kept as UTF-8
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, DatasetError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn ensure_parent(path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
    ensure_parent(path)?;
    fs::write(path, bytes).map_err(|e| DatasetError::io(path, e))
}
