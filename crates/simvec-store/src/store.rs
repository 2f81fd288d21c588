use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use simvec_core::{
    DeleteOutcome, Document, ScoredRecord, SimvecError, SimvecResult, VectorRecord,
};
use simvec_index::{snapshot, InMemoryIndex, Metric};

use crate::embedding::EmbeddingProvider;

/// How many matches a search returns when the caller does not say.
pub const DEFAULT_TOP_K: usize = 4;

/// Parameters for a similarity search.
///
/// Only the text is required; `top_k` defaults to [`DEFAULT_TOP_K`] and
/// no threshold is applied unless one is set.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The text to embed and search with.
    pub text: String,
    /// Maximum number of matches to return.
    pub top_k: usize,
    /// Minimum score a match must reach, inclusive.
    pub threshold: Option<f64>,
}

impl SearchQuery {
    /// Creates a query with the default limits.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: DEFAULT_TOP_K,
            threshold: None,
        }
    }

    /// Caps the number of matches returned.
    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Drops matches scoring below `threshold`. The comparison is
    /// inclusive: a match scoring exactly `threshold` is kept.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Public contract bridging text-oriented callers to the vector engine.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds and stores every document, returning the stored ids in
    /// input order.
    ///
    /// All-or-nothing: each document is embedded and validated before
    /// anything is stored, so when one fails nothing lands and the
    /// error (plus a warning event) names the offender. Documents with
    /// an explicit id upsert over an existing record with that id.
    async fn add(&self, documents: Vec<Document>) -> SimvecResult<Vec<String>>;

    /// Removes the given ids. Absent ids are not an error; the outcome
    /// reports how much of the request took effect. Duplicate ids count
    /// once.
    async fn delete(&self, ids: &[String]) -> SimvecResult<DeleteOutcome>;

    /// Embeds the query text and returns the most similar records,
    /// best first. No matches is an empty result, never an error.
    async fn similarity_search(&self, query: SearchQuery) -> SimvecResult<Vec<ScoredRecord>>;

    /// Number of records currently stored.
    async fn count(&self) -> SimvecResult<usize>;
}

/// In-memory store: one index behind a read-write lock plus a shared
/// embedding provider.
///
/// Searches take the read half and proceed in parallel; mutations
/// serialize behind the write half, so a query always observes a full
/// batch or none of it. Embeddings are computed before any lock is
/// taken, which keeps provider latency and cancellation outside the
/// critical section: a timed-out embed call leaves the index untouched.
pub struct SimpleVectorStore {
    index: RwLock<InMemoryIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SimpleVectorStore {
    /// Creates an empty store scoring with [`Metric::Cosine`].
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_metric(embedder, Metric::default())
    }

    /// Creates an empty store scoring with the given metric.
    pub fn with_metric(embedder: Arc<dyn EmbeddingProvider>, metric: Metric) -> Self {
        Self {
            index: RwLock::new(InMemoryIndex::with_metric(metric)),
            embedder,
        }
    }

    /// Wraps an existing index, typically one restored from a snapshot.
    pub fn from_index(embedder: Arc<dyn EmbeddingProvider>, index: InMemoryIndex) -> Self {
        Self {
            index: RwLock::new(index),
            embedder,
        }
    }

    /// The metric the index scores with.
    pub async fn metric(&self) -> Metric {
        self.index.read().await.metric()
    }

    /// The dimension the corpus is locked to, or `None` while empty.
    pub async fn dimension(&self) -> Option<usize> {
        self.index.read().await.dimension()
    }

    /// Encodes the current index state as snapshot bytes.
    ///
    /// Runs under the read lock, so the bytes are a consistent
    /// point-in-time view even with writers queued.
    pub async fn snapshot(&self) -> SimvecResult<Vec<u8>> {
        let index = self.index.read().await;
        snapshot::encode(&index)
    }
}

#[async_trait]
impl VectorStore for SimpleVectorStore {
    async fn add(&self, documents: Vec<Document>) -> SimvecResult<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        // Embed everything before locking. One provider call per
        // document keeps failure attribution exact.
        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            let Document {
                id,
                content,
                metadata,
            } = document;
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let embedding = match self.embedder.embed(&content).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(document = %id, error = %e, "batch add aborted, embedding failed");
                    return Err(e);
                }
            };
            records.push(VectorRecord::new(id, content, embedding).with_metadata(metadata));
        }
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        let mut index = self.index.write().await;
        if let Err(e) = index.upsert_many(records) {
            warn!(error = %e, "batch add aborted, index rejected the batch");
            return Err(e);
        }
        debug!(added = ids.len(), total = index.len(), "documents stored");
        Ok(ids)
    }

    async fn delete(&self, ids: &[String]) -> SimvecResult<DeleteOutcome> {
        let requested = ids
            .iter()
            .map(String::as_str)
            .collect::<HashSet<&str>>()
            .len();
        let mut index = self.index.write().await;
        let removed = index.delete(ids);
        debug!(requested, removed, "delete applied");
        Ok(DeleteOutcome { requested, removed })
    }

    async fn similarity_search(&self, query: SearchQuery) -> SimvecResult<Vec<ScoredRecord>> {
        if query.text.trim().is_empty() {
            return Err(SimvecError::InvalidArgument(
                "query text must not be empty".to_string(),
            ));
        }
        let embedding = self.embedder.embed(&query.text).await?;
        let index = self.index.read().await;
        let results = index.query(&embedding, query.top_k, query.threshold)?;
        debug!(
            top_k = query.top_k,
            threshold = ?query.threshold,
            matched = results.len(),
            "similarity search complete"
        );
        Ok(results)
    }

    async fn count(&self) -> SimvecResult<usize> {
        Ok(self.index.read().await.len())
    }
}
