//! One conversational turn, end to end:
//!
//! enhance → extract intent → (comparison branch) → filter → rank → synthesize → record.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::Catalog;
use crate::compare::{ComparisonOutcome, ComparisonResolver};
use crate::config::Config;
use crate::llm::intent::{IntentExtractor, OracleUnderstanding};
use crate::llm::oracle::Oracle;
use crate::llm::synthesis::{OracleSynthesizer, ResponseSynthesizer, StaticSynthesizer, SynthesisRequest};
use crate::memory::ConversationMemory;
use crate::models::{IntentKind, IntentRecord, ScoredVehicle};
use crate::resolve::EntityResolver;
use crate::search::filter::FilterEngine;
use crate::search::rank::RankingEngine;

pub const GREETING_REPLY: &str = "Hi there! How can I assist you with your car-related questions?";

static GREETING_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:hi|hello|hey|greetings)(?:\s+there)?\s*[!.,?]*\s*$").expect("valid greeting pattern")
});

/// What a turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// As extracted. Memory records the resolved catalog keys instead.
    pub intent: IntentRecord,
    /// Candidates left after filtering (0 for greetings and comparisons)
    pub filtered: usize,
    pub ranked: Vec<ScoredVehicle>,
    pub response: String,
}

pub struct Assistant {
    extractor: IntentExtractor,
    filter: FilterEngine,
    ranking: RankingEngine,
    synthesizer: ResponseSynthesizer,
}

impl Assistant {
    /// Language-model backed assistant.
    pub fn new(config: &Config, oracle: Arc<dyn Oracle>) -> Self {
        Self::from_parts(
            IntentExtractor::new(OracleUnderstanding::new(oracle.clone(), config.llm.intent_max_tokens)),
            ResponseSynthesizer::new(OracleSynthesizer::new(oracle, config.llm.response_max_tokens)),
            config,
        )
    }

    /// Keyword intents and a fixed reply; no network access.
    pub fn offline(config: &Config) -> Self {
        Self::from_parts(
            IntentExtractor::offline(),
            ResponseSynthesizer::new(StaticSynthesizer),
            config,
        )
    }

    pub fn from_parts(extractor: IntentExtractor, synthesizer: ResponseSynthesizer, config: &Config) -> Self {
        Self {
            extractor,
            filter: FilterEngine::new(EntityResolver::new(config.thresholds)),
            ranking: RankingEngine::new(config.ranking.clone()),
            synthesizer,
        }
    }

    /// Run one turn against `catalog`, recording it in `memory`. Never fails:
    /// every oracle problem has already degraded to a fallback by the time we return.
    pub async fn respond(&self, catalog: &Catalog, memory: &mut ConversationMemory, query: &str) -> TurnOutcome {
        if GREETING_ONLY.is_match(query) {
            return TurnOutcome {
                intent: IntentRecord::new(IntentKind::GeneralInfo),
                filtered: 0,
                ranked: Vec::new(),
                response: GREETING_REPLY.to_string(),
            };
        }

        let intent = self.extractor.extract(query, memory).await;
        // Memory keeps catalog keys, never the raw mentions.
        let recorded = self.filter.resolve_entities(catalog.index(), &intent);

        if intent.intent == IntentKind::Comparison {
            let outcome = ComparisonResolver::new(&self.filter, &self.ranking).resolve(catalog, query, &intent, memory);
            if let ComparisonOutcome::Answered { found, .. } = &outcome {
                memory.add_exchange(query, outcome.response(), &recorded, *found);
            }
            return TurnOutcome {
                response: outcome.response().to_string(),
                intent,
                filtered: 0,
                ranked: Vec::new(),
            };
        }

        let candidates = self.filter.filter(catalog, &intent);
        let ranked = self.ranking.rank(&candidates, &intent);
        tracing::info!(
            "Intent {}: {} candidates, {} ranked",
            intent.intent,
            candidates.len(),
            ranked.len()
        );

        let conversation = memory.context();
        let response = self
            .synthesizer
            .render(&SynthesisRequest {
                query,
                intent: &intent,
                vehicles: &ranked,
                conversation: &conversation,
            })
            .await;

        memory.add_exchange(query, &response, &recorded, ranked.len());
        tracing::debug!("{}", memory.summary());

        TurnOutcome {
            filtered: candidates.len(),
            intent,
            ranked,
            response,
        }
    }
}
