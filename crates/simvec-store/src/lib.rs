//! Store facade for the simvec engine.
//!
//! This crate connects text-oriented callers to the retrieval core: an
//! embedding provider turns text into vectors, a store keeps them in an
//! index behind a read-write lock, and an optional snapshot file makes
//! the corpus durable across restarts.
//!
//! # Main types
//!
//! - [`EmbeddingProvider`] — Boundary trait for text-to-vector backends.
//! - [`HashEmbedder`] — Deterministic local provider, no network needed.
//! - [`VectorStore`] — The public add/delete/search contract.
//! - [`SearchQuery`] — Query text plus `top_k` and threshold knobs.
//! - [`SimpleVectorStore`] — In-memory reference implementation.
//! - [`PersistentVectorStore`] — Snapshot-backed store with atomic
//!   rewrites.
//!
//! With the `http-embeddings` feature, [`HttpEmbedder`] talks to any
//! OpenAI-compatible embeddings endpoint.

/// Embedding provider boundary and the local hashed-TF implementation.
pub mod embedding;
/// OpenAI-compatible HTTP embedding provider.
#[cfg(feature = "http-embeddings")]
pub mod http;
/// Snapshot-backed persistent store.
pub mod persistent;
/// The store facade trait and its in-memory implementation.
pub mod store;

pub use embedding::{EmbeddingProvider, HashEmbedder};
#[cfg(feature = "http-embeddings")]
pub use http::HttpEmbedder;
pub use persistent::PersistentVectorStore;
pub use store::{SearchQuery, SimpleVectorStore, VectorStore, DEFAULT_TOP_K};
