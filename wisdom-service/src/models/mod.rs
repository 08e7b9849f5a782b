//! Domain models for the wisdom service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One hit from the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: String,

    /// Similarity score reported by the index. Not used for ranking here.
    #[serde(default)]
    pub score: Option<f32>,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl Match {
    /// Source passage stored under `metadata.text`, if it is a non-empty string.
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("text"))
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn with_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), Value::String(text.into()));
        Self {
            id: id.into(),
            score: None,
            metadata: Some(metadata),
        }
    }
}
