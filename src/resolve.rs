//! Entity Resolver: fuzzy-match free-text manufacturer/model mentions to catalog keys.

use crate::catalog::ManufacturerIndex;
use crate::config::MatchThresholds;

/// String similarity on a 0–100 scale (100 = identical).
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Normalized indel similarity: `200 * LCS(a, b) / (|a| + |b|)`.
///
/// Insertions and deletions cost 1, substitutions are not allowed, so a
/// transposed pair costs 2. This matches the classic "fuzzy ratio".
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl Similarity for IndelRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 100.0;
        }
        200.0 * lcs_len(&a, &b) as f64 / total as f64
    }
}

/// Longest common subsequence length, single rolling row.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for ca in a {
        let mut diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

pub struct EntityResolver {
    similarity: Box<dyn Similarity>,
    thresholds: MatchThresholds,
}

impl EntityResolver {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self::with_similarity(IndelRatio, thresholds)
    }

    pub fn with_similarity(similarity: impl Similarity + 'static, thresholds: MatchThresholds) -> Self {
        Self {
            similarity: Box::new(similarity),
            thresholds,
        }
    }

    /// Best-scoring manufacturer key, if its score exceeds the manufacturer threshold.
    pub fn resolve_manufacturer<'a>(&self, index: &'a ManufacturerIndex, text: &str) -> Option<&'a str> {
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.best_match(&query, index.manufacturers(), self.thresholds.manufacturer)
    }

    /// Best-scoring model registered under `manufacturer` (which must already be a catalog key).
    pub fn resolve_model<'a>(
        &self,
        index: &'a ManufacturerIndex,
        text: &str,
        manufacturer: &str,
    ) -> Option<&'a str> {
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        let models = index.models(manufacturer)?;
        self.best_match(&query, models, self.thresholds.model)
    }

    /// First strict maximum above `threshold` wins.
    fn best_match<'a>(
        &self,
        query: &str,
        candidates: impl Iterator<Item = &'a str>,
        threshold: f64,
    ) -> Option<&'a str> {
        let mut best: Option<(&'a str, f64)> = None;
        for candidate in candidates {
            let score = self.similarity.score(query, candidate);
            if score > threshold && best.map_or(true, |(_, b)| score > b) {
                best = Some((candidate, score));
            }
        }
        best.map(|(key, _)| key)
    }
}
