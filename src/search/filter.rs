use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{Catalog, ManufacturerIndex};
use crate::models::{CatalogRecord, IntentRecord};
use crate::resolve::EntityResolver;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Narrows the catalog by the entities of an intent record.
pub struct FilterEngine {
    resolver: EntityResolver,
}

impl FilterEngine {
    pub fn new(resolver: EntityResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// The intent with its manufacturer and model replaced by the catalog keys
    /// they resolve to. Unresolvable mentions become `None`; a model only
    /// resolves under a resolved manufacturer.
    pub fn resolve_entities(&self, index: &ManufacturerIndex, intent: &IntentRecord) -> IntentRecord {
        let manufacturer = intent
            .manufacturer
            .as_deref()
            .and_then(|m| self.resolver.resolve_manufacturer(index, m));
        let model = manufacturer.and_then(|m| {
            intent
                .model
                .as_deref()
                .and_then(|text| self.resolver.resolve_model(index, text, m))
        });
        IntentRecord {
            manufacturer: manufacturer.map(str::to_string),
            model: model.map(str::to_string),
            ..intent.clone()
        }
    }

    /// Predicates apply in a fixed order: manufacturer, model, year, price range.
    /// An absent or unresolvable field leaves the running set untouched.
    pub fn filter<'a>(&self, catalog: &'a Catalog, intent: &IntentRecord) -> Vec<&'a CatalogRecord> {
        let resolved = self.resolve_entities(catalog.index(), intent);
        let mut candidates: Vec<&CatalogRecord> = catalog.records().iter().collect();

        if let Some(key) = resolved.manufacturer.as_deref() {
            candidates.retain(|r| r.manufacturer == key);
            tracing::info!("Filtered by manufacturer: {key}, {} records", candidates.len());
        }

        if let Some(key) = resolved.model.as_deref() {
            candidates.retain(|r| r.model == key);
            tracing::info!("Filtered by model: {key}, {} records", candidates.len());
        }

        if let Some(year) = intent.year.as_deref() {
            let year = year.trim().to_lowercase();
            candidates.retain(|r| r.year.to_lowercase().contains(&year));
            tracing::info!("Filtered by year: {year}, {} records", candidates.len());
        }

        if let Some(text) = intent.price_range.as_deref() {
            let (min, max) = parse_price_range(text);
            if let Some(min) = min {
                candidates.retain(|r| r.lower_bound.is_some_and(|lo| lo >= min));
            }
            if let Some(max) = max {
                candidates.retain(|r| r.upper_bound.is_some_and(|hi| hi <= max));
            }
            tracing::info!(
                "Filtered by price range: {min:?}-{max:?}, {} records",
                candidates.len()
            );
        }

        candidates
    }
}

/// Parse a free-text budget into `(min, max)`. A lone figure is an upper bound.
pub fn parse_price_range(text: &str) -> (Option<f64>, Option<f64>) {
    let stripped = text.replace(',', "");
    let numbers: Vec<f64> = DIGITS
        .find_iter(&stripped)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();

    if numbers.is_empty() {
        return (None, None);
    }
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let lower = stripped.to_lowercase();
    if lower.contains("under") || lower.contains("below") {
        (None, Some(max))
    } else if lower.contains("over") || lower.contains("above") {
        (Some(min), None)
    } else if lower.contains("between") && numbers.len() >= 2 {
        (Some(min), Some(max))
    } else {
        (None, Some(max))
    }
}
