use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use simvec_core::{DeleteOutcome, Document, ScoredRecord, SimvecResult};
use simvec_index::{snapshot, Metric};

use crate::embedding::EmbeddingProvider;
use crate::store::{SearchQuery, SimpleVectorStore, VectorStore};

/// Snapshot-backed store: every successful mutation re-encodes the full
/// index and atomically replaces one snapshot file.
///
/// Writes go to a sibling temp file first and are renamed over the
/// snapshot, so the file on disk is always a complete, digest-valid
/// snapshot even across crashes. When persisting itself fails, the
/// in-memory state keeps the mutation and the error is surfaced;
/// reopening falls back to the last durable snapshot.
pub struct PersistentVectorStore {
    path: PathBuf,
    inner: SimpleVectorStore,
    // Serializes persist calls so temp-file writes never interleave.
    write_gate: Mutex<()>,
}

impl PersistentVectorStore {
    /// Opens the store at `path`, restoring the snapshot if one exists.
    ///
    /// A missing file starts an empty store with the given metric (the
    /// parent directory is created for it). An existing snapshot keeps
    /// the metric it was written with; a request for a different one is
    /// logged and ignored. Unreadable or tampered bytes fail with
    /// [`simvec_core::SimvecError::CorruptData`] rather than silently
    /// starting fresh.
    pub async fn open(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        metric: Metric,
    ) -> SimvecResult<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let bytes = tokio::fs::read(&path).await?;
            let index = snapshot::decode(&bytes)?;
            if index.metric() != metric {
                warn!(
                    snapshot = %index.metric(),
                    requested = %metric,
                    "snapshot metric differs from requested, keeping the snapshot's"
                );
            }
            info!(path = %path.display(), records = index.len(), "snapshot restored");
            SimpleVectorStore::from_index(embedder, index)
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            SimpleVectorStore::with_metric(embedder, metric)
        };
        Ok(Self {
            path,
            inner,
            write_gate: Mutex::new(()),
        })
    }

    /// Where the snapshot lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The metric the index scores with.
    pub async fn metric(&self) -> Metric {
        self.inner.metric().await
    }

    /// The dimension the corpus is locked to, or `None` while empty.
    pub async fn dimension(&self) -> Option<usize> {
        self.inner.dimension().await
    }

    async fn persist(&self) -> SimvecResult<()> {
        let _gate = self.write_gate.lock().await;
        let bytes = self.inner.snapshot().await?;
        let tmp = self.path.with_extension("svec.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

impl fmt::Debug for PersistentVectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentVectorStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorStore for PersistentVectorStore {
    async fn add(&self, documents: Vec<Document>) -> SimvecResult<Vec<String>> {
        let ids = self.inner.add(documents).await?;
        if !ids.is_empty() {
            self.persist().await?;
        }
        Ok(ids)
    }

    async fn delete(&self, ids: &[String]) -> SimvecResult<DeleteOutcome> {
        let outcome = self.inner.delete(ids).await?;
        if outcome.removed > 0 {
            self.persist().await?;
        }
        Ok(outcome)
    }

    async fn similarity_search(&self, query: SearchQuery) -> SimvecResult<Vec<ScoredRecord>> {
        self.inner.similarity_search(query).await
    }

    async fn count(&self) -> SimvecResult<usize> {
        self.inner.count().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use simvec_core::SimvecError;

    fn embedder() -> Arc<HashEmbedder> {
        Arc::new(HashEmbedder::new(64))
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.svec");

        {
            let store = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
                .await
                .unwrap();
            store
                .add(vec![
                    Document::new("durable first document").with_id("a"),
                    Document::new("durable second document").with_id("b"),
                ])
                .await
                .unwrap();
        }
        assert!(path.exists());

        let reopened = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let results = reopened
            .similarity_search(SearchQuery::new("durable first document"))
            .await
            .unwrap();
        assert_eq!(results[0].record.id, "a");
    }

    #[tokio::test]
    async fn test_delete_rewrites_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.svec");

        let store = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        store
            .add(vec![
                Document::new("kept document").with_id("keep"),
                Document::new("dropped document").with_id("drop"),
            ])
            .await
            .unwrap();
        let outcome = store.delete(&["drop".to_string()]).await.unwrap();
        assert!(outcome.is_complete());

        let reopened = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.svec");

        {
            let store = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
                .await
                .unwrap();
            store
                .add(vec![Document::new("soon to be mangled")])
                .await
                .unwrap();
        }

        // Truncate the file; opening must fail loudly, not start fresh.
        let bytes = tokio::fs::read(&path).await.unwrap();
        tokio::fs::write(&path, &bytes[..bytes.len() / 2])
            .await
            .unwrap();

        let result = PersistentVectorStore::open(&path, embedder(), Metric::Cosine).await;
        assert!(matches!(result, Err(SimvecError::CorruptData(_))));
    }

    #[tokio::test]
    async fn test_missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/corpus.svec");

        let store = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        store
            .add(vec![Document::new("some nested document")])
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_failed_add_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.svec");

        let store = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        store
            .add(vec![Document::new("good document").with_id("good")])
            .await
            .unwrap();
        let before = tokio::fs::read(&path).await.unwrap();

        let result = store.add(vec![Document::new("")]).await;
        assert!(result.is_err());

        let after = tokio::fs::read(&path).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_its_metric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.svec");

        {
            let store = PersistentVectorStore::open(&path, embedder(), Metric::Euclidean)
                .await
                .unwrap();
            store
                .add(vec![Document::new("euclidean document")])
                .await
                .unwrap();
        }

        // Reopening with a different metric keeps the snapshot's.
        let reopened = PersistentVectorStore::open(&path, embedder(), Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(reopened.metric().await, Metric::Euclidean);
    }
}
