use crate::config::RankingConfig;
use crate::models::{CatalogRecord, IntentRecord, ScoredVehicle};

/// Price at which the price sub-score halves.
const PRICE_SCALE: f64 = 100_000.0;
const DEFAULT_SUBSCORE: f64 = 0.5;

/// Weighted multi-factor dealer ranking.
///
/// Score = convex combination of:
/// - price competitiveness: `1 / (1 + avg_price / 100_000)`, cheaper is better
/// - location match: 1.0 when the requested city/region matches, else 0.5
/// - contact completeness: 1.0 when the contact string is longer than 10 chars, else 0.5
/// - seller name completeness: 1.0 when longer than 3 chars, else 0.5
/// - recency: constant, no listing timestamps are available
pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn top_n(&self) -> usize {
        self.config.top_n
    }

    pub fn score(&self, record: &CatalogRecord, intent: &IntentRecord) -> f64 {
        let w = &self.config.weights;
        let score = w.price * price_score(record)
            + w.location * location_score(record, intent)
            + w.contact * completeness(&record.dealer.contact, 10)
            + w.seller_name * completeness(&record.dealer.seller, 3)
            + w.recency * w.recency_constant;
        score.clamp(0.0, 1.0)
    }

    /// Score every candidate and keep the best `top_n`. Ties keep input order.
    pub fn rank(&self, candidates: &[&CatalogRecord], intent: &IntentRecord) -> Vec<ScoredVehicle> {
        let mut scored: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .map(|(i, r)| (i, self.score(r, intent)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.top_n);

        scored
            .into_iter()
            .map(|(i, score)| ScoredVehicle {
                vehicle: candidates[i].clone(),
                score,
            })
            .collect()
    }
}

fn price_score(record: &CatalogRecord) -> f64 {
    match record.average_price().or(record.price) {
        Some(avg) => 1.0 / (1.0 + avg.max(0.0) / PRICE_SCALE),
        None => 0.0,
    }
}

fn location_score(record: &CatalogRecord, intent: &IntentRecord) -> f64 {
    let matches = |wanted: Option<&str>, actual: &str| {
        wanted
            .map(|w| w.trim().to_lowercase())
            .is_some_and(|w| !w.is_empty() && actual.contains(&w))
    };
    if matches(intent.city.as_deref(), &record.dealer.city)
        || matches(intent.region.as_deref(), &record.dealer.region)
    {
        1.0
    } else {
        DEFAULT_SUBSCORE
    }
}

fn completeness(field: &str, min_chars: usize) -> f64 {
    if field.chars().count() > min_chars {
        1.0
    } else {
        DEFAULT_SUBSCORE
    }
}
