use std::collections::{HashMap, HashSet};

use simvec_core::{ScoredRecord, SimvecError, SimvecResult, VectorRecord};
use tracing::debug;

use crate::metric::Metric;

/// Exact, insertion-ordered vector index scanned in full on every query.
///
/// Scanning keeps results exact and the structure simple. Suitable for
/// corpora that fit in memory, up to roughly 100k records; beyond that
/// an approximate index is the better tool.
///
/// The dimension is not configured anywhere: the first record inserted
/// fixes it, and every later record and query must match it. Ties in
/// query scores resolve to the earlier-inserted record, and an upsert
/// keeps the record's original position, so result order is stable
/// across re-ingestion.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    metric: Metric,
    records: Vec<VectorRecord>,
    // Positions into `records`; rebuilt after deletions.
    by_id: HashMap<String, usize>,
}

impl InMemoryIndex {
    /// Creates an empty index using [`Metric::Cosine`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index scoring with the given metric.
    pub fn with_metric(metric: Metric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// The metric this index scores with.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// The dimension the corpus is locked to, or `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(VectorRecord::dimension)
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.by_id.get(id).map(|&pos| &self.records[pos])
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Removes every record. The next insert fixes a fresh dimension.
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_id.clear();
    }

    /// Inserts a record, or replaces the record with the same id while
    /// keeping its position.
    ///
    /// Fails without mutating when the record is malformed, its
    /// dimension disagrees with the corpus, or it has zero magnitude
    /// under the cosine metric.
    pub fn upsert(&mut self, record: VectorRecord) -> SimvecResult<()> {
        self.check_storable(&record, self.dimension())?;
        self.insert_unchecked(record);
        Ok(())
    }

    /// Inserts a batch with all-or-nothing semantics: every record is
    /// validated before the first one is stored, so a failure reported
    /// for one record means none of them landed.
    pub fn upsert_many(&mut self, records: Vec<VectorRecord>) -> SimvecResult<()> {
        let mut expected = self.dimension();
        for record in &records {
            self.check_storable(record, expected)?;
            expected = expected.or(Some(record.dimension()));
        }
        let count = records.len();
        for record in records {
            self.insert_unchecked(record);
        }
        debug!(count, total = self.records.len(), "batch upsert applied");
        Ok(())
    }

    /// Removes the given ids, ignoring ones that are absent, and returns
    /// how many records were actually removed. Duplicate ids in the
    /// request count once.
    pub fn delete(&mut self, ids: &[String]) -> usize {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.records.len();
        self.records.retain(|r| !targets.contains(r.id.as_str()));
        let removed = before - self.records.len();
        if removed > 0 {
            self.by_id = self
                .records
                .iter()
                .enumerate()
                .map(|(pos, r)| (r.id.clone(), pos))
                .collect();
        }
        removed
    }

    /// Scores every record against `query` and returns at most `top_k`
    /// results, best first.
    ///
    /// With a `threshold`, only records scoring at or above it are
    /// returned (the comparison is inclusive). An empty index yields an
    /// empty result, never an error; malformed arguments fail before
    /// any scoring happens.
    pub fn query(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: Option<f64>,
    ) -> SimvecResult<Vec<ScoredRecord>> {
        if top_k == 0 {
            return Err(SimvecError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if let Some(t) = threshold {
            if !self.metric.threshold_in_range(t) {
                return Err(SimvecError::InvalidArgument(format!(
                    "threshold {t} is outside the score range of the {} metric",
                    self.metric
                )));
            }
        }
        self.check_query_vector(query)?;

        let mut scored: Vec<(usize, f64)> = Vec::new();
        for (pos, record) in self.records.iter().enumerate() {
            let score = self.metric.score(query, &record.embedding)?;
            if threshold.map_or(true, |t| score >= t) {
                scored.push((pos, score));
            }
        }

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(
            top_k,
            ?threshold,
            matched = scored.len(),
            scanned = self.records.len(),
            "index query scored"
        );

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredRecord {
                record: self.records[pos].clone(),
                score,
            })
            .collect())
    }

    fn check_storable(&self, record: &VectorRecord, expected: Option<usize>) -> SimvecResult<()> {
        record.validate(expected)?;
        if self.metric == Metric::Cosine && record.is_degenerate() {
            return Err(SimvecError::DegenerateVector(format!(
                "record '{}' has zero magnitude, which cosine cannot rank",
                record.id
            )));
        }
        Ok(())
    }

    fn check_query_vector(&self, query: &[f32]) -> SimvecResult<()> {
        if query.is_empty() {
            return Err(SimvecError::InvalidArgument(
                "query embedding must not be empty".to_string(),
            ));
        }
        if let Some(pos) = query.iter().position(|c| !c.is_finite()) {
            return Err(SimvecError::InvalidArgument(format!(
                "query embedding has a non-finite component at position {pos}"
            )));
        }
        if let Some(expected) = self.dimension() {
            if query.len() != expected {
                return Err(SimvecError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }
        if self.metric == Metric::Cosine && query.iter().all(|c| *c == 0.0) {
            return Err(SimvecError::DegenerateVector(
                "query vector has zero magnitude".to_string(),
            ));
        }
        Ok(())
    }

    fn insert_unchecked(&mut self, record: VectorRecord) {
        match self.by_id.get(record.id.as_str()) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.by_id.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}
