//! Comparison Resolver: answers "which is cheaper"-style questions about two cars
//! by running the filter and ranking engines once per compared item.

use crate::catalog::{title_case, Catalog};
use crate::memory::ConversationMemory;
use crate::models::{format_amount, IntentKind, IntentRecord, ScoredVehicle};
use crate::search::filter::FilterEngine;
use crate::search::rank::RankingEngine;

pub const CLARIFICATION_MESSAGE: &str = "I need information about at least two cars to make a comparison. \
     Could you please specify which cars you'd like to compare?";
pub const INSUFFICIENT_DATA_MESSAGE: &str = "I couldn't find sufficient data to compare these vehicles.";
pub const MISSING_PRICE_MESSAGE: &str =
    "I couldn't find price information for both vehicles to make a comparison.";

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    /// Fewer than two cars to compare, even after consulting memory.
    NeedsItems,
    /// A reply was produced; `found` is how many of the compared items matched a listing.
    Answered { response: String, found: usize },
}

impl ComparisonOutcome {
    pub fn response(&self) -> &str {
        match self {
            ComparisonOutcome::NeedsItems => CLARIFICATION_MESSAGE,
            ComparisonOutcome::Answered { response, .. } => response,
        }
    }
}

struct Priced {
    label: String,
    price: f64,
}

pub struct ComparisonResolver<'a> {
    filter: &'a FilterEngine,
    ranking: &'a RankingEngine,
}

impl<'a> ComparisonResolver<'a> {
    pub fn new(filter: &'a FilterEngine, ranking: &'a RankingEngine) -> Self {
        Self { filter, ranking }
    }

    pub fn resolve(
        &self,
        catalog: &Catalog,
        query: &str,
        intent: &IntentRecord,
        memory: &ConversationMemory,
    ) -> ComparisonOutcome {
        let mut items = intent.comparison_items.clone().unwrap_or_default();
        if items.len() < 2 {
            let recent = memory.cars_for_comparison();
            if recent.len() >= 2 {
                items = recent;
            } else {
                return ComparisonOutcome::NeedsItems;
            }
        }

        let best: Vec<(String, ScoredVehicle)> = items
            .iter()
            .take(2)
            .filter_map(|item| self.best_for(catalog, item, intent).map(|v| (title_case(item.trim()), v)))
            .collect();
        let found = best.len();
        tracing::info!("Comparison matched {found} of {} items", items.len().min(2));

        if found < 2 {
            return ComparisonOutcome::Answered {
                response: INSUFFICIENT_DATA_MESSAGE.to_string(),
                found,
            };
        }

        let mut priced: Vec<Priced> = best
            .into_iter()
            .filter_map(|(label, v)| v.vehicle.reference_price().map(|price| Priced { label, price }))
            .collect();
        if priced.len() < 2 {
            return ComparisonOutcome::Answered {
                response: MISSING_PRICE_MESSAGE.to_string(),
                found,
            };
        }
        priced.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

        ComparisonOutcome::Answered {
            response: render(query, &priced[0], &priced[1]),
            found,
        }
    }

    /// Top-ranked listing for one descriptor: first token is the manufacturer, second the model.
    fn best_for(&self, catalog: &Catalog, item: &str, outer: &IntentRecord) -> Option<ScoredVehicle> {
        let lower = item.to_lowercase();
        let mut tokens = lower.split_whitespace();
        let manufacturer = tokens.next()?;

        // An unknown manufacturer would leave the filter unconstrained.
        self.filter
            .resolver()
            .resolve_manufacturer(catalog.index(), manufacturer)?;

        let probe = IntentRecord {
            intent: IntentKind::PriceInquiry,
            manufacturer: Some(manufacturer.to_string()),
            model: tokens.next().map(str::to_string),
            region: outer.region.clone(),
            city: outer.city.clone(),
            year: outer.year.clone(),
            ..Default::default()
        };

        let candidates = self.filter.filter(catalog, &probe);
        self.ranking.rank(&candidates, &probe).into_iter().next()
    }
}

fn render(query: &str, cheaper: &Priced, dearer: &Priced) -> String {
    let gap = dearer.price - cheaper.price;
    let lower = query.to_lowercase();
    if lower.contains("cheaper") || lower.contains("less expensive") {
        format!(
            "The **{}** is cheaper at GHS {}, which is GHS {} less than the {} at GHS {}.",
            cheaper.label,
            format_amount(cheaper.price),
            format_amount(gap),
            dearer.label,
            format_amount(dearer.price)
        )
    } else {
        format!(
            "**Comparison Results:**\n\n\
             • **{}**: GHS {}\n\
             • **{}**: GHS {}\n\n\
             The {} is GHS {} less expensive than the {}.",
            cheaper.label,
            format_amount(cheaper.price),
            dearer.label,
            format_amount(dearer.price),
            cheaper.label,
            format_amount(gap),
            dearer.label
        )
    }
}
