//! Classification decisions returned by the language model
//!
//! Model output is untrusted text. `decode` reduces it to the JSON object it
//! contains and checks it against the expected shape, returning a typed
//! `DecodeError` instead of guessing.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use thiserror::Error;

/// Why a classification answer could not be used
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The text holds no parsable JSON
    #[error("response is not JSON: {0}")]
    NotJson(String),

    /// Valid JSON, but missing keys or wrong types
    #[error("response does not match the expected shape: {0}")]
    Schema(String),
}

/// Answer to the delete-intent check
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteDecision {
    /// The user wants something forgotten
    #[serde(rename = "shouldDelete", deserialize_with = "lenient_bool")]
    pub should_delete: bool,
    /// Subjects to forget
    #[serde(rename = "memoryToForget", default, deserialize_with = "string_list")]
    pub memory_to_forget: Vec<String>,
}

impl DeleteDecision {
    /// Subjects to act on; empty when nothing should be deleted
    pub fn subjects(&self) -> Vec<String> {
        if self.should_delete {
            self.memory_to_forget.clone()
        } else {
            Vec::new()
        }
    }
}

/// Answer to the create-intent check
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateDecision {
    /// The message holds durable facts
    #[serde(rename = "shouldRemember", deserialize_with = "lenient_bool")]
    pub should_remember: bool,
    /// One atomic fact per item
    #[serde(default, deserialize_with = "optional_string_list")]
    pub memory: Option<Vec<String>>,
}

impl CreateDecision {
    /// Facts to store; empty when nothing should be remembered
    pub fn facts(&self) -> Vec<String> {
        match (&self.memory, self.should_remember) {
            (Some(facts), true) => facts.clone(),
            _ => Vec::new(),
        }
    }
}

/// Answer to the retrieval-need check
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RetrievalDecision {
    /// Answering needs stored memories
    #[serde(rename = "requiresMemory", deserialize_with = "lenient_bool")]
    pub requires_memory: bool,
}

/// Decode a classification answer
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let candidate = extract_json_object(raw);
    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|e| DecodeError::NotJson(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))
}

/// Narrow model text down to the outermost `{...}` it contains
///
/// Handles code fences and prose around the object. Text without braces is
/// returned trimmed so the JSON error names the real problem.
pub fn extract_json_object(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(RawFlag::Bool(b)) => Ok(b),
        Some(RawFlag::Int(0)) => Ok(false),
        Some(RawFlag::Int(1)) => Ok(true),
        Some(RawFlag::Int(n)) => Err(de::Error::custom(format!("invalid flag value {}", n))),
        Some(RawFlag::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(de::Error::custom(format!("invalid flag value {:?}", other))),
        },
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?
        .map(clean)
        .unwrap_or_default())
}

fn optional_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.map(clean))
}
