use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{SimvecError, SimvecResult};

/// An embedded entry stored in a vector index.
///
/// Records are the unit of storage and retrieval: the embedding drives
/// similarity scoring while `content` and `metadata` travel along so a
/// match is useful on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier within the owning index. Re-inserting an id
    /// overwrites the previous record.
    pub id: String,
    /// The original text this record was embedded from.
    pub content: String,
    /// Arbitrary key-value metadata carried through storage and search.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// The embedding vector. Every record in an index has the same
    /// dimension, fixed by the first record inserted.
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    /// Creates a record with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
            embedding,
        }
    }

    /// Replaces the metadata map, builder-style.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of components in the embedding.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// True when every component is zero, i.e. the vector has no
    /// direction and cosine similarity against it is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.embedding.iter().all(|c| *c == 0.0)
    }

    /// Checks the record is storable: non-empty id, non-empty embedding
    /// with only finite components, and a dimension matching `expected`
    /// when the index has already fixed one.
    pub fn validate(&self, expected: Option<usize>) -> SimvecResult<()> {
        if self.id.trim().is_empty() {
            return Err(SimvecError::InvalidArgument(
                "record id must not be empty".to_string(),
            ));
        }
        if self.embedding.is_empty() {
            return Err(SimvecError::InvalidArgument(format!(
                "record '{}': embedding must not be empty",
                self.id
            )));
        }
        if let Some(pos) = self.embedding.iter().position(|c| !c.is_finite()) {
            return Err(SimvecError::InvalidArgument(format!(
                "record '{}': non-finite component at position {pos}",
                self.id
            )));
        }
        if let Some(expected) = expected {
            if self.embedding.len() != expected {
                return Err(SimvecError::DimensionMismatch {
                    expected,
                    actual: self.embedding.len(),
                });
            }
        }
        Ok(())
    }
}

/// A record paired with the similarity score it earned for a query.
///
/// Scores are in the range of the index metric; higher always means
/// more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// The matching record.
    pub record: VectorRecord,
    /// Similarity between the query and the record under the index
    /// metric.
    pub score: f64,
}
