//! Inbound need and resource records.
//!
//! Both registries hand over the same loose shape: an identifier, a
//! human-readable description, optional metadata, and whatever other keys
//! the registry stores. Fields are read leniently here; required-field
//! checks happen in the matcher so they surface as `InvalidRequest`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A need or a resource as supplied by a registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier. Registries may send strings or numbers; both become a string.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Any other keys the registry attached (title, category, quantity, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Something that needs satisfying.
pub type Need = Record;

/// Something available that might help satisfy a need.
pub type Resource = Record;

impl Record {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            metadata: None,
            extra: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Metadata and extra keys merged into one object, for prompt context.
    pub fn context(&self) -> Map<String, Value> {
        let mut merged = self.extra.clone();
        if let Some(metadata) = &self.metadata {
            for (k, v) in metadata {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}
