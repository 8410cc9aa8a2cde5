// Topic records - raw input entries of the study-note dataset

use serde::Deserialize;
use serde_json::Value;

/// Content field of a topic record
///
/// Variants are listed in the order the normalizer emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Qna,
    Summary,
    Notes,
    Cheatsheet,
}

impl Field {
    /// All recognized fields, in emission order
    pub const ALL: [Field; 4] = [Field::Qna, Field::Summary, Field::Notes, Field::Cheatsheet];

    /// Key of this field inside the `response` object
    pub fn key(&self) -> &'static str {
        match self {
            Field::Qna => "qna",
            Field::Summary => "summary",
            Field::Notes => "notes",
            Field::Cheatsheet => "cheatsheet",
        }
    }

    /// Instruction text for a topic
    pub fn instruction(&self, topic: &str) -> String {
        match self {
            Field::Qna => format!("What is {}?", topic),
            Field::Summary => format!("Summarize {}", topic),
            Field::Notes => format!("Notes for {}", topic),
            Field::Cheatsheet => format!("Cheatsheet for {}", topic),
        }
    }
}

/// Value of a content field
///
/// Resolved once at deserialization. Anything that is neither a string
/// nor a list of strings lands in `Other` and is rendered as JSON text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Other(Value),
}

impl FieldValue {
    /// Render as a single output string (lists joined with newlines)
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join("\n"),
            FieldValue::Other(value) => value.to_string(),
        }
    }

    /// True when the value took the lenient fallback branch
    pub fn is_coerced(&self) -> bool {
        matches!(self, FieldValue::Other(_))
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(items: Vec<&str>) -> Self {
        FieldValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Optional content fields of one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    pub qna: Option<FieldValue>,
    pub summary: Option<FieldValue>,
    pub notes: Option<FieldValue>,
    pub cheatsheet: Option<FieldValue>,
}

impl Responses {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        match field {
            Field::Qna => self.qna.as_ref(),
            Field::Summary => self.summary.as_ref(),
            Field::Notes => self.notes.as_ref(),
            Field::Cheatsheet => self.cheatsheet.as_ref(),
        }
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        let slot = match field {
            Field::Qna => &mut self.qna,
            Field::Summary => &mut self.summary,
            Field::Notes => &mut self.notes,
            Field::Cheatsheet => &mut self.cheatsheet,
        };
        *slot = Some(value);
    }

    /// Number of recognized fields present
    pub fn count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// One raw dataset entry: a topic plus its optional content fields
///
/// On disk the topic is stored under `instruction` and the fields under
/// `response`. A missing or non-object `response` has no fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawTopicRecord")]
pub struct TopicRecord {
    pub topic: String,
    pub responses: Responses,
}

impl TopicRecord {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            responses: Responses::default(),
        }
    }

    pub fn with_field(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.responses.set(field, value.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(expecting = "a topic record object")]
struct RawTopicRecord {
    #[serde(default)]
    instruction: Value,
    #[serde(default)]
    response: Value,
}

impl From<RawTopicRecord> for TopicRecord {
    fn from(raw: RawTopicRecord) -> Self {
        let topic = match raw.instruction {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        };

        let mut responses = Responses::default();
        if let Value::Object(mut map) = raw.response {
            for field in Field::ALL {
                if let Some(value) = map.remove(field.key()) {
                    // `Other` accepts anything, so the fallback is never taken
                    let value = FieldValue::deserialize(&value)
                        .unwrap_or_else(|_| FieldValue::Other(value));
                    responses.set(field, value);
                }
            }
        }

        Self { topic, responses }
    }
}
