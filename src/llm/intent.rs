//! Intent Extractor: raw query + conversation memory → [`IntentRecord`].
//!
//! The language model is tried first. Any transport or parse failure falls
//! through to [`KeywordUnderstanding`], so extraction itself never fails.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::OracleError;
use crate::llm::oracle::{Oracle, Prompt};
use crate::memory::ConversationMemory;
use crate::models::{IntentKind, IntentRecord};

/// A JSON object with at most one level of nested braces.
static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("valid JSON object pattern"));

const PRICE_KEYWORDS: &[&str] = &["price", "cost", "how much", "expensive"];

/// Interpret a user query in the light of the conversation so far.
#[async_trait]
pub trait Understand: Send + Sync {
    async fn understand(&self, query: &str, memory: &ConversationMemory) -> Result<IntentRecord, OracleError>;
}

/// Language-model backed understanding.
pub struct OracleUnderstanding {
    oracle: Arc<dyn Oracle>,
    max_tokens: u32,
}

impl OracleUnderstanding {
    pub fn new(oracle: Arc<dyn Oracle>, max_tokens: u32) -> Self {
        Self { oracle, max_tokens }
    }
}

#[async_trait]
impl Understand for OracleUnderstanding {
    async fn understand(&self, query: &str, memory: &ConversationMemory) -> Result<IntentRecord, OracleError> {
        let enhanced = memory.enhance_query(query);
        let prompt = Prompt {
            system: build_system_prompt(),
            user: build_user_prompt(&memory.context(), &enhanced),
            max_tokens: self.max_tokens,
        };

        let content = self.oracle.complete(&prompt).await?;
        tracing::debug!("Raw intent response: {content}");
        parse_intent(&content)
    }
}

/// Deterministic keyword classifier. Never consults the language model.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordUnderstanding;

impl KeywordUnderstanding {
    pub fn classify(&self, query: &str, memory: &ConversationMemory) -> IntentRecord {
        if ConversationMemory::is_comparison(query) {
            let cars = memory.cars_for_comparison();
            return IntentRecord {
                intent: IntentKind::Comparison,
                comparison_items: (!cars.is_empty()).then_some(cars),
                ..Default::default()
            };
        }

        let lower = query.to_lowercase();
        if PRICE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            IntentRecord::new(IntentKind::PriceInquiry)
        } else {
            IntentRecord::new(IntentKind::GeneralInfo)
        }
    }
}

#[async_trait]
impl Understand for KeywordUnderstanding {
    async fn understand(&self, query: &str, memory: &ConversationMemory) -> Result<IntentRecord, OracleError> {
        Ok(self.classify(query, memory))
    }
}

pub struct IntentExtractor {
    primary: Box<dyn Understand>,
    fallback: KeywordUnderstanding,
}

impl IntentExtractor {
    pub fn new(primary: impl Understand + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            fallback: KeywordUnderstanding,
        }
    }

    /// Keyword classification only.
    pub fn offline() -> Self {
        Self::new(KeywordUnderstanding)
    }

    pub async fn extract(&self, query: &str, memory: &ConversationMemory) -> IntentRecord {
        match self.primary.understand(query, memory).await {
            Ok(mut intent) => {
                let needs_items = intent
                    .comparison_items
                    .as_ref()
                    .map_or(true, |items| items.is_empty());
                if intent.intent == IntentKind::Comparison && needs_items {
                    let cars = memory.cars_for_comparison();
                    if !cars.is_empty() {
                        intent.comparison_items = Some(cars);
                    }
                }
                tracing::info!("Extracted intent: {:?}", intent);
                intent
            }
            Err(e) => {
                tracing::warn!("Intent extraction failed, using keyword fallback: {e}");
                self.fallback.classify(query, memory)
            }
        }
    }
}

fn build_system_prompt() -> String {
    String::from(
        "You are a query analyzer for a car dealership assistant in Ghana. \
         Extract the following from the user's query:\n\
         1. intent: one of \"price_inquiry\", \"dealer_search\", \"comparison\", \"general_info\"\n\
         2. manufacturer: car manufacturer/brand\n\
         3. model: specific car model\n\
         4. region: preferred region in Ghana\n\
         5. city: preferred city\n\
         6. price_range: budget or price range mentioned\n\
         7. year: model year if mentioned\n\
         8. comparison_items: for comparison queries, the cars being compared\n\n\
         Rules:\n\
         - Return ONLY a JSON object, no other text.\n\
         - Use the conversation context to resolve follow-up and referential queries.\n\
         - For queries like \"which is cheaper\", use intent \"comparison\" and take both cars from context.\n\
         - Use null for anything not mentioned.\n\n\
         Format:\n\
         {\"intent\": \"price_inquiry\", \"manufacturer\": \"toyota\", \"model\": \"camry\", \"region\": null, \
         \"city\": null, \"price_range\": null, \"year\": null, \"comparison_items\": null}\n\
         {\"intent\": \"comparison\", \"manufacturer\": null, \"model\": null, \"region\": null, \"city\": null, \
         \"price_range\": null, \"year\": null, \"comparison_items\": [\"toyota camry\", \"honda accord\"]}",
    )
}

fn build_user_prompt(conversation: &str, query: &str) -> String {
    format!(
        "Conversation Context:\n{conversation}\n\nCurrent Query: {query}\n\n\
         Return ONLY the JSON object for intent and entities extraction."
    )
}

/// Parse an oracle reply into an intent record, tolerating prose around the JSON.
fn parse_intent(content: &str) -> Result<IntentRecord, OracleError> {
    let json_str = JSON_OBJECT
        .find(content)
        .map(|m| m.as_str())
        .unwrap_or(content);

    let value: Value = serde_json::from_str(json_str).map_err(|e| OracleError::Parse(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(OracleError::Parse("expected a JSON object".to_string()));
    };

    let intent = obj
        .get("intent")
        .and_then(Value::as_str)
        .and_then(IntentKind::parse)
        .unwrap_or_default();

    Ok(IntentRecord {
        intent,
        manufacturer: text_field(&obj, "manufacturer"),
        model: text_field(&obj, "model"),
        region: text_field(&obj, "region"),
        city: text_field(&obj, "city"),
        price_range: text_field(&obj, "price_range"),
        year: text_field(&obj, "year"),
        comparison_items: items_field(&obj, "comparison_items"),
    })
}

/// Missing, null, and blank all collapse to `None`. Numbers are kept as text.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match obj.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text)
    }
}

fn items_field(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = match obj.get(key)? {
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => return None,
    };
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Scripted {
        reply: Result<String, ()>,
        seen: Mutex<Vec<Prompt>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Oracle for Scripted {
        async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError> {
            self.seen.lock().push(prompt.clone());
            self.reply.clone().map_err(|_| OracleError::Empty)
        }
    }

    fn extractor(oracle: Arc<Scripted>) -> IntentExtractor {
        IntentExtractor::new(OracleUnderstanding::new(oracle, 300))
    }

    fn memory_with_two_cars() -> ConversationMemory {
        let mut memory = ConversationMemory::default();
        for (m, model) in [("toyota", "camry"), ("honda", "accord")] {
            let intent = IntentRecord {
                intent: IntentKind::PriceInquiry,
                manufacturer: Some(m.into()),
                model: Some(model.into()),
                ..Default::default()
            };
            memory.add_exchange(&format!("price of {m} {model}"), "some answer", &intent, 1);
        }
        memory
    }

    // ─── JSON parsing ────────────────────────────────────

    #[test]
    fn test_parse_clean_json() {
        let input = r#"{"intent": "price_inquiry", "manufacturer": "toyota", "model": "camry", "region": null, "city": null, "price_range": null, "year": null, "comparison_items": null}"#;
        let intent = parse_intent(input).unwrap();
        assert_eq!(intent.intent, IntentKind::PriceInquiry);
        assert_eq!(intent.manufacturer.as_deref(), Some("toyota"));
        assert_eq!(intent.model.as_deref(), Some("camry"));
        assert!(intent.region.is_none());
        assert!(intent.comparison_items.is_none());
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let input = "Sure! Here you go:\n```json\n{\"intent\": \"dealer_search\", \"city\": \"Kumasi\"}\n```\nAnything else?";
        let intent = parse_intent(input).unwrap();
        assert_eq!(intent.intent, IntentKind::DealerSearch);
        assert_eq!(intent.city.as_deref(), Some("Kumasi"));
    }

    #[test]
    fn test_parse_missing_fields_become_none() {
        let intent = parse_intent(r#"{"intent": "general_info"}"#).unwrap();
        assert_eq!(intent, IntentRecord::new(IntentKind::GeneralInfo));
    }

    #[test]
    fn test_parse_numeric_year_kept_as_text() {
        let intent = parse_intent(r#"{"intent": "price_inquiry", "year": 2019}"#).unwrap();
        assert_eq!(intent.year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_parse_unknown_intent_is_general_info() {
        let intent = parse_intent(r#"{"intent": "chit_chat", "manufacturer": "kia"}"#).unwrap();
        assert_eq!(intent.intent, IntentKind::GeneralInfo);
        assert_eq!(intent.manufacturer.as_deref(), Some("kia"));
    }

    #[test]
    fn test_parse_comparison_items() {
        let intent = parse_intent(
            r#"{"intent": "comparison", "comparison_items": ["toyota camry", " ", "honda accord"]}"#,
        )
        .unwrap();
        assert_eq!(
            intent.comparison_items,
            Some(vec!["toyota camry".to_string(), "honda accord".to_string()])
        );
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_intent("I don't understand the question.").is_err());
        assert!(parse_intent("{\"intent\": ").is_err());
        assert!(parse_intent("[1, 2]").is_err());
    }

    // ─── Keyword fallback ────────────────────────────────

    #[test]
    fn test_fallback_comparison_seeded_from_memory() {
        let memory = memory_with_two_cars();
        let intent = KeywordUnderstanding.classify("which is cheaper?", &memory);
        assert_eq!(intent.intent, IntentKind::Comparison);
        assert_eq!(
            intent.comparison_items,
            Some(vec!["Honda Accord".to_string(), "Toyota Camry".to_string()])
        );
        assert!(intent.manufacturer.is_none());
    }

    #[test]
    fn test_fallback_comparison_without_memory() {
        let intent = KeywordUnderstanding.classify("which is cheaper?", &ConversationMemory::default());
        assert_eq!(intent, IntentRecord::new(IntentKind::Comparison));
    }

    #[test]
    fn test_fallback_price_and_general() {
        let memory = ConversationMemory::default();
        assert_eq!(
            KeywordUnderstanding.classify("How much is a Corolla?", &memory).intent,
            IntentKind::PriceInquiry
        );
        assert_eq!(
            KeywordUnderstanding.classify("Tell me about dealers in Tema", &memory).intent,
            IntentKind::GeneralInfo
        );
    }

    // ─── Extractor ───────────────────────────────────────

    #[tokio::test]
    async fn test_extract_uses_oracle_reply() {
        let oracle = Scripted::ok(r#"{"intent": "price_inquiry", "manufacturer": "toyota", "model": "camry"}"#);
        let intent = extractor(oracle.clone())
            .extract("price of toyota camry", &ConversationMemory::default())
            .await;
        assert_eq!(intent.manufacturer.as_deref(), Some("toyota"));

        let seen = oracle.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].system.contains("JSON"));
        assert!(seen[0].user.contains("Current Query: price of toyota camry"));
        assert_eq!(seen[0].max_tokens, 300);
    }

    #[tokio::test]
    async fn test_extract_passes_enhanced_query_and_history() {
        let oracle = Scripted::ok(r#"{"intent": "price_inquiry"}"#);
        let memory = memory_with_two_cars();
        extractor(oracle.clone()).extract("what about in Tema?", &memory).await;

        let seen = oracle.seen.lock();
        let user = &seen[0].user;
        assert!(user.contains("Previous conversation:"));
        assert!(user.contains("User: price of honda accord"));
        assert!(user.contains("Previously searched manufacturer: honda"));
        assert!(user.contains("Current query: what about in Tema?"));
    }

    #[tokio::test]
    async fn test_extract_backfills_comparison_items() {
        let oracle = Scripted::ok(r#"{"intent": "comparison", "comparison_items": []}"#);
        let intent = extractor(oracle).extract("which is cheaper", &memory_with_two_cars()).await;
        assert_eq!(intent.intent, IntentKind::Comparison);
        assert_eq!(intent.comparison_items.map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_oracle_failure() {
        let memory = ConversationMemory::default();
        let ex = extractor(Scripted::failing());
        assert_eq!(ex.extract("is the camry cheaper", &memory).await.intent, IntentKind::Comparison);
        assert_eq!(ex.extract("how much for a rav4", &memory).await.intent, IntentKind::PriceInquiry);
        assert_eq!(ex.extract("good morning", &memory).await.intent, IntentKind::GeneralInfo);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_malformed_reply() {
        let ex = extractor(Scripted::ok("The user wants a price, I think."));
        let intent = ex.extract("how much is a camry", &ConversationMemory::default()).await;
        assert_eq!(intent, IntentRecord::new(IntentKind::PriceInquiry));
    }

    #[tokio::test]
    async fn test_offline_extractor() {
        let intent = IntentExtractor::offline()
            .extract("price of a civic", &ConversationMemory::default())
            .await;
        assert_eq!(intent.intent, IntentKind::PriceInquiry);
    }
}
