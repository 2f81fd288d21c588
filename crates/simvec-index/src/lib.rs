//! Exact in-memory similarity index for the simvec engine.
//!
//! This crate holds the retrieval core: the similarity metrics, the
//! brute-force [`InMemoryIndex`], and the binary snapshot codec that
//! persists an index to bytes and restores it with integrity checks.
//!
//! # Main types
//!
//! - [`Metric`] — Similarity metric fixed per index (cosine by default).
//! - [`InMemoryIndex`] — Insertion-ordered, exact top-k index.
//! - [`snapshot`] — `encode`/`decode` between an index and durable bytes.

/// The in-memory index and its query semantics.
pub mod index;
/// Similarity metrics and their scoring functions.
pub mod metric;
/// Binary snapshot encoding with an integrity digest.
pub mod snapshot;

pub use index::InMemoryIndex;
pub use metric::{cosine_similarity, dot_product, euclidean_similarity, Metric};
