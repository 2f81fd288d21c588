//! Core types and error definitions for the simvec similarity engine.
//!
//! This crate provides the foundational types shared across all simvec
//! crates: the unified error enum, the stored vector record, and the
//! document and outcome types used by the store facade.
//!
//! # Main types
//!
//! - [`SimvecError`] — Unified error enum for all simvec subsystems.
//! - [`SimvecResult`] — Convenience alias for `Result<T, SimvecError>`.
//! - [`VectorRecord`] — An embedded entry stored in an index.
//! - [`ScoredRecord`] — A record paired with its similarity score.
//! - [`Document`] — Raw ingestion input, before embedding.
//! - [`DeleteOutcome`] — Definite result of a delete request.

/// Ingestion inputs and mutation outcomes for the store facade.
pub mod document;
/// Stored records and scored query results.
pub mod record;

pub use document::{DeleteOutcome, Document};
pub use record::{ScoredRecord, VectorRecord};

// --- Error types ---

/// Top-level error type for the simvec engine.
///
/// Each variant corresponds to a failure class callers are expected to
/// distinguish.
#[derive(Debug, thiserror::Error)]
pub enum SimvecError {
    /// A vector's dimension does not match the dimension the index is
    /// locked to.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the index was fixed to by its first record.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// A caller-supplied parameter is structurally invalid (empty id,
    /// zero `top_k`, non-finite component, out-of-range threshold).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An embedding provider failed to produce a vector.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Persisted bytes failed structural or integrity validation.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// A zero-magnitude vector was given where the metric requires a
    /// direction.
    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`SimvecError`].
pub type SimvecResult<T> = Result<T, SimvecError>;
