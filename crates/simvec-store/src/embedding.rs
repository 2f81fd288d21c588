use async_trait::async_trait;
use std::collections::HashMap;

use simvec_core::{SimvecError, SimvecResult};

/// Boundary trait for turning text into embedding vectors.
///
/// Implementations must be deterministic per input within one session
/// and produce vectors of a single fixed dimension. Failures are
/// reported as [`SimvecError::Provider`] and are never retried here;
/// retry policy belongs to the provider or the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Computes the embedding for a single text.
    async fn embed(&self, text: &str) -> SimvecResult<Vec<f32>>;

    /// Computes embeddings for several texts, in input order.
    ///
    /// The default calls [`embed`](Self::embed) once per text; providers
    /// with a batch endpoint should override it.
    async fn embed_batch(&self, texts: &[&str]) -> SimvecResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Dimension of every vector this provider produces.
    fn dimension(&self) -> usize;
}

/// Local hashed term-frequency embedder.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each token to three
/// salted positions, accumulates term-frequency weights there, and L2
/// normalizes the result. No model or network involved, so it runs
/// anywhere and always returns the same vector for the same text.
/// Retrieval quality is lexical rather than semantic; swap in a real
/// model via [`EmbeddingProvider`] when that matters.
///
/// Text that yields no tokens (empty, whitespace, single letters) is a
/// [`SimvecError::Provider`] failure rather than a zero vector, so a
/// degenerate embedding can never reach the index.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> SimvecResult<Vec<f32>> {
        if self.dimension == 0 {
            return Err(SimvecError::Provider(
                "embedder dimension must be at least 1".to_string(),
            ));
        }

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .collect();
        if tokens.is_empty() {
            return Err(SimvecError::Provider(format!(
                "text {:?} produced no tokens to embed",
                truncate_for_log(text)
            )));
        }

        let mut frequency: HashMap<&str, f32> = HashMap::new();
        for token in &tokens {
            *frequency.entry(token).or_insert(0.0) += 1.0;
        }
        let total = tokens.len() as f32;

        let mut vector = vec![0.0f32; self.dimension];
        for (token, count) in &frequency {
            let tf = count / total;
            // Three salted positions per token spread collisions out.
            vector[fnv1a(token.as_bytes(), 0) as usize % self.dimension] += tf;
            vector[fnv1a(token.as_bytes(), 1) as usize % self.dimension] += tf * 0.7;
            vector[fnv1a(token.as_bytes(), 2) as usize % self.dimension] += tf * 0.5;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        for v in &mut vector {
            *v /= norm;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// FNV-1a over the token bytes plus a trailing salt byte.
fn fnv1a(bytes: &[u8], salt: u8) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in bytes.iter().chain(std::iter::once(&salt)) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

fn truncate_for_log(text: &str) -> &str {
    let mut end = text.len().min(32);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
