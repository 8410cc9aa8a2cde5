// Record normalizer - topic records to instruction/output pairs
//
// Pure and order-preserving. Each record contributes one pair per
// recognized field, in the order qna, summary, notes, cheatsheet.

use super::pair::InstructionPair;
use super::record::{Field, TopicRecord};

/// Counters collected during a normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub records_in: usize,
    pub pairs_out: usize,
    /// Records with none of the recognized fields
    pub dropped_records: usize,
    /// Field values rendered through the JSON-text fallback
    pub coerced_values: usize,
}

/// Output of a normalization pass
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub pairs: Vec<InstructionPair>,
    pub report: NormalizeReport,
}

/// Pairs produced by a single record
pub fn normalize_record(record: &TopicRecord) -> Vec<InstructionPair> {
    Field::ALL
        .iter()
        .filter_map(|field| {
            record
                .responses
                .get(*field)
                .map(|value| InstructionPair::new(field.instruction(&record.topic), value.to_text()))
        })
        .collect()
}

/// Normalize a full record sequence
pub fn normalize(records: &[TopicRecord]) -> Normalized {
    let mut out = Normalized::default();
    out.report.records_in = records.len();

    for record in records {
        if record.responses.is_empty() {
            out.report.dropped_records += 1;
            continue;
        }

        out.report.coerced_values += Field::ALL
            .iter()
            .filter_map(|f| record.responses.get(*f))
            .filter(|v| v.is_coerced())
            .count();

        out.pairs.extend(normalize_record(record));
    }

    out.report.pairs_out = out.pairs.len();
    out
}
