use serde::{Deserialize, Serialize};
use simvec_core::{SimvecError, SimvecResult};

/// The similarity metric an index applies to every scoring operation.
///
/// A metric is chosen when the index is created and never changes, so
/// scores and thresholds stay comparable across the life of a corpus.
/// Higher scores always mean more similar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Angle between the vectors, in `[-1.0, 1.0]`. Scale-invariant and
    /// undefined for zero-magnitude vectors.
    #[default]
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + d)`, in `(0.0, 1.0]`.
    /// Sensitive to vector magnitude.
    Euclidean,
    /// Raw dot product. Unbounded; thresholds are only meaningful when
    /// the caller scales vectors consistently.
    #[serde(rename = "dot")]
    DotProduct,
}

impl Metric {
    /// Scores `query` against `candidate` under this metric.
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> SimvecResult<f64> {
        match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::Euclidean => euclidean_similarity(query, candidate),
            Metric::DotProduct => dot_product(query, candidate),
        }
    }

    /// Whether `threshold` is a score this metric can actually produce.
    /// Non-finite thresholds are never valid.
    pub fn threshold_in_range(&self, threshold: f64) -> bool {
        if !threshold.is_finite() {
            return false;
        }
        match self {
            Metric::Cosine => (-1.0..=1.0).contains(&threshold),
            Metric::Euclidean => (0.0..=1.0).contains(&threshold),
            Metric::DotProduct => true,
        }
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dot",
        }
    }

    /// One-byte tag used by the snapshot header.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Metric::Cosine => 0,
            Metric::Euclidean => 1,
            Metric::DotProduct => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Metric::Cosine),
            1 => Some(Metric::Euclidean),
            2 => Some(Metric::DotProduct),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn check_pair(a: &[f32], b: &[f32]) -> SimvecResult<()> {
    if a.is_empty() || b.is_empty() {
        return Err(SimvecError::InvalidArgument(
            "vectors must not be empty".to_string(),
        ));
    }
    if a.len() != b.len() {
        return Err(SimvecError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Cosine similarity between `a` and `b`.
///
/// Accumulates in `f64` so long or small-magnitude vectors do not lose
/// precision to intermediate rounding. Fails with
/// [`SimvecError::DegenerateVector`] when either vector has zero
/// magnitude, since the angle is undefined there.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> SimvecResult<f64> {
    check_pair(a, b)?;
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimvecError::DegenerateVector(
            "cosine similarity is undefined for zero-magnitude vectors".to_string(),
        ));
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Euclidean distance between `a` and `b`, mapped into `(0.0, 1.0]` via
/// `1 / (1 + d)` so that identical vectors score `1.0`.
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> SimvecResult<f64> {
    check_pair(a, b)?;
    let mut sum_sq = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = f64::from(*x) - f64::from(*y);
        sum_sq += d * d;
    }
    Ok(1.0 / (1.0 + sum_sq.sqrt()))
}

/// Raw dot product of `a` and `b`, accumulated in `f64`.
pub fn dot_product(a: &[f32], b: &[f32]) -> SimvecResult<f64> {
    check_pair(a, b)?;
    let mut dot = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
    }
    Ok(dot)
}
