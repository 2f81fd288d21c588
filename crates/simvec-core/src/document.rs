use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw document handed to the store for ingestion: text plus optional
/// metadata and an optional caller-chosen id.
///
/// When `id` is `None` the store assigns a fresh UUID at add time, so
/// repeated ingestion of the same text produces distinct records.
/// Supplying an id opts into upsert semantics instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Caller-chosen identifier, or `None` to let the store generate one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The text to embed and store.
    pub content: String,
    /// Arbitrary key-value metadata carried through to the stored record.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Creates a document with no metadata and a store-assigned id.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Sets an explicit id, opting into upsert semantics.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replaces the metadata map, builder-style.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The definite result of a delete request.
///
/// Deleting an absent id is not an error; callers inspect the counts to
/// learn how much of the request took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// How many ids the caller asked to remove.
    pub requested: usize,
    /// How many records were present and removed.
    pub removed: usize,
}

impl DeleteOutcome {
    /// True when every requested id was present and removed.
    pub fn is_complete(&self) -> bool {
        self.removed == self.requested
    }
}
