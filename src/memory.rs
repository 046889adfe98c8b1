//! Conversation Memory: a bounded, drop-oldest history of turns plus the
//! "last search context" snapshot used to resolve follow-up queries.
//!
//! Not safe for concurrent mutation by two turns of the same conversation;
//! callers serialize turns (see [`crate::state::AppState`]).

use std::collections::VecDeque;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::title_case;
use crate::models::{IntentKind, IntentRecord, TurnView};

pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Turns rendered into prompts as conversational grounding.
const CONTEXT_TURNS: usize = 5;
/// Characters of each past response kept in that grounding.
const CONTEXT_RESPONSE_CHARS: usize = 200;

const FOLLOW_UP_INDICATORS: &[&str] = &[
    "what about", "how about", "and", "also", "too", "as well",
    "which one", "which is", "compare", "cheaper", "better",
    "that one", "this one", "those", "these", "them",
    "similar", "alternative", "instead", "other",
];

const COMPARISON_INDICATORS: &[&str] = &[
    "which is cheaper", "which is better", "which one is", "compare",
    "vs", "versus", "difference between", "cheaper", "more expensive",
    "better", "worse", "which should i", "which would you",
];

#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
    pub intent: IntentRecord,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Entities of the most recent search that produced results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchContext {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<String>,
    pub intent: Option<IntentKind>,
}

impl SearchContext {
    fn from_intent(intent: &IntentRecord) -> Self {
        Self {
            manufacturer: intent.manufacturer.clone(),
            model: intent.model.clone(),
            location: intent.location().map(str::to_string),
            price_range: intent.price_range.clone(),
            intent: Some(intent.intent),
        }
    }

    fn render(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("manufacturer", &self.manufacturer),
            ("model", &self.model),
            ("location", &self.location),
            ("price range", &self.price_range),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(|v| format!("Previously searched {label}: {v}"))
        })
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    max_history: usize,
    turns: VecDeque<ConversationTurn>,
    last_search: Option<SearchContext>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ConversationMemory {
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            max_history,
            turns: VecDeque::with_capacity(max_history),
            last_search: None,
        }
    }

    /// Record a finished turn. The last search context only moves on a
    /// non-comparison turn that actually found something.
    pub fn add_exchange(&mut self, query: &str, response: &str, intent: &IntentRecord, result_count: usize) {
        if self.turns.len() == self.max_history {
            self.turns.pop_front();
        }
        self.turns.push_back(ConversationTurn {
            query: query.to_string(),
            response: response.to_string(),
            intent: intent.clone(),
            result_count,
            timestamp: Utc::now(),
        });

        if result_count > 0 && intent.intent != IntentKind::Comparison {
            self.last_search = Some(SearchContext::from_intent(intent));
        }
    }

    /// Recent exchanges formatted as prompt grounding. Empty when there is no history.
    pub fn context(&self) -> String {
        if self.turns.is_empty() {
            return String::new();
        }
        let mut ctx = String::from("Previous conversation:\n");
        for turn in self.recent(CONTEXT_TURNS) {
            let _ = write!(
                ctx,
                "\nUser: {}\nAssistant: {}\n",
                turn.query,
                truncate_chars(&turn.response, CONTEXT_RESPONSE_CHARS)
            );
        }
        ctx
    }

    /// Up to `limit` most recent turns, oldest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(limit))
    }

    /// Distinct "Manufacturer Model" names from the last `limit` turns, most recent first.
    /// Only turns that named both a manufacturer and a model count.
    pub fn recently_mentioned_cars(&self, limit: usize) -> Vec<String> {
        let mut cars: Vec<String> = Vec::new();
        for turn in self.turns.iter().rev().take(limit) {
            if let (Some(manufacturer), Some(model)) = (&turn.intent.manufacturer, &turn.intent.model) {
                let name = title_case(&format!("{} {}", manufacturer.trim(), model.trim()));
                if !cars.contains(&name) {
                    cars.push(name);
                }
            }
        }
        cars
    }

    /// The two most recently mentioned distinct cars (fewer if history is thin).
    pub fn cars_for_comparison(&self) -> Vec<String> {
        let mut cars = self.recently_mentioned_cars(self.max_history);
        cars.truncate(2);
        cars
    }

    pub fn has_recent_car_searches(&self) -> bool {
        self.recently_mentioned_cars(CONTEXT_TURNS).len() >= 2
    }

    pub fn is_follow_up(&self, query: &str) -> bool {
        !self.turns.is_empty() && contains_any(query, FOLLOW_UP_INDICATORS)
    }

    pub fn is_comparison(query: &str) -> bool {
        contains_any(query, COMPARISON_INDICATORS)
    }

    /// Prefix a follow-up query with the last successful search's entities.
    pub fn enhance_query(&self, query: &str) -> String {
        if !self.is_follow_up(query) {
            return query.to_string();
        }
        match self.last_search.as_ref().and_then(SearchContext::render) {
            Some(rendered) => {
                let enhanced = format!("Context: {rendered}. Current query: {query}");
                tracing::info!("Enhanced query with context: {enhanced}");
                enhanced
            }
            None => query.to_string(),
        }
    }

    pub fn last_search_context(&self) -> Option<&SearchContext> {
        self.last_search.as_ref()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn views(&self) -> Vec<TurnView> {
        self.turns
            .iter()
            .map(|t| TurnView {
                query: t.query.clone(),
                response: t.response.clone(),
                intent: t.intent.clone(),
                result_count: t.result_count,
                timestamp: t.timestamp,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.last_search = None;
    }

    /// One line per turn, for debug logging.
    pub fn summary(&self) -> String {
        if self.turns.is_empty() {
            return "No conversation history".to_string();
        }
        let mut out = format!("Conversation history ({} exchanges):\n", self.turns.len());
        for (i, t) in self.turns.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. Query: '{}' | Intent: {} | Car: {} {} | Found: {} vehicles",
                i + 1,
                truncate_chars(&t.query, 50),
                t.intent.intent,
                t.intent.manufacturer.as_deref().unwrap_or("unknown"),
                t.intent.model.as_deref().unwrap_or("unknown"),
                t.result_count
            );
        }
        out
    }
}

fn contains_any(query: &str, phrases: &[&str]) -> bool {
    let lower = query.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car_intent(manufacturer: &str, model: Option<&str>) -> IntentRecord {
        IntentRecord {
            intent: IntentKind::PriceInquiry,
            manufacturer: Some(manufacturer.into()),
            model: model.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_history_is_bounded_drop_oldest() {
        let mut memory = ConversationMemory::new(3);
        for i in 0..7 {
            memory.add_exchange(&format!("q{i}"), "r", &IntentRecord::default(), 0);
            assert!(memory.len() <= 3);
        }
        let queries: Vec<&str> = memory.turns().map(|t| t.query.as_str()).collect();
        assert_eq!(queries, vec!["q4", "q5", "q6"]);
    }

    #[test]
    fn test_last_search_only_updates_on_results() {
        let mut memory = ConversationMemory::default();
        memory.add_exchange("q1", "r1", &car_intent("toyota", Some("camry")), 2);
        memory.add_exchange("q2", "r2", &car_intent("ferrari", Some("enzo")), 0);
        let ctx = memory.last_search_context().unwrap();
        assert_eq!(ctx.manufacturer.as_deref(), Some("toyota"));
        assert_eq!(ctx.model.as_deref(), Some("camry"));
        assert_eq!(ctx.intent, Some(IntentKind::PriceInquiry));
    }

    #[test]
    fn test_comparison_turn_keeps_last_search() {
        let mut memory = ConversationMemory::default();
        memory.add_exchange("q1", "r1", &car_intent("honda", Some("accord")), 1);
        memory.add_exchange("which is cheaper", "r2", &IntentRecord::new(IntentKind::Comparison), 2);
        assert_eq!(memory.len(), 2);
        let ctx = memory.last_search_context().unwrap();
        assert_eq!(ctx.manufacturer.as_deref(), Some("honda"));
        assert_eq!(
            memory.enhance_query("what about in accra"),
            "Context: Previously searched manufacturer: honda; Previously searched model: accord. \
             Current query: what about in accra"
        );
    }

    #[test]
    fn test_context_empty_without_history() {
        assert_eq!(ConversationMemory::default().context(), "");
    }

    #[test]
    fn test_context_keeps_last_five_and_truncates() {
        let mut memory = ConversationMemory::default();
        for i in 0..7 {
            memory.add_exchange(&format!("question {i}"), &"x".repeat(300), &IntentRecord::default(), 0);
        }
        let ctx = memory.context();
        assert!(ctx.starts_with("Previous conversation:"));
        assert!(!ctx.contains("question 1\n"));
        assert!(ctx.contains("question 2"));
        assert!(ctx.contains("question 6"));
        assert!(ctx.contains(&format!("Assistant: {}...", "x".repeat(200))));
        assert!(!ctx.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_cars_for_comparison_most_recent_first_distinct() {
        let mut memory = ConversationMemory::default();
        memory.add_exchange("a", "r", &car_intent("toyota", Some("camry")), 1);
        memory.add_exchange("b", "r", &car_intent("honda", Some("accord")), 1);
        memory.add_exchange("c", "r", &car_intent("kia", None), 1);
        memory.add_exchange("d", "r", &car_intent("honda", Some("accord")), 1);
        assert_eq!(memory.cars_for_comparison(), vec!["Honda Accord", "Toyota Camry"]);
    }

    #[test]
    fn test_cars_for_comparison_requires_model() {
        let mut memory = ConversationMemory::default();
        memory.add_exchange("a", "r", &car_intent("kia", None), 1);
        memory.add_exchange("b", "r", &car_intent("toyota", Some("camry")), 1);
        assert_eq!(memory.cars_for_comparison(), vec!["Toyota Camry"]);
        assert!(!memory.has_recent_car_searches());
    }

    #[test]
    fn test_enhance_query_on_follow_up() {
        let mut memory = ConversationMemory::default();
        let mut intent = car_intent("toyota", Some("camry"));
        intent.city = Some("kumasi".into());
        memory.add_exchange("price of toyota camry in kumasi", "r", &intent, 3);

        let enhanced = memory.enhance_query("what about in accra?");
        assert_eq!(
            enhanced,
            "Context: Previously searched manufacturer: toyota; Previously searched model: camry; \
             Previously searched location: kumasi. Current query: what about in accra?"
        );
    }

    #[test]
    fn test_enhance_query_passthrough() {
        let mut memory = ConversationMemory::default();
        // follow-up phrase but no successful search yet
        memory.add_exchange("hello", "hi", &IntentRecord::default(), 0);
        assert_eq!(memory.enhance_query("what about kia"), "what about kia");

        memory.add_exchange("toyota camry", "r", &car_intent("toyota", Some("camry")), 1);
        // no follow-up phrase
        assert_eq!(memory.enhance_query("price of kia rio"), "price of kia rio");
    }

    #[test]
    fn test_comparison_detection() {
        assert!(ConversationMemory::is_comparison("Which is CHEAPER?"));
        assert!(ConversationMemory::is_comparison("camry vs accord"));
        assert!(!ConversationMemory::is_comparison("how much is a camry"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut memory = ConversationMemory::default();
        memory.add_exchange("a", "r", &car_intent("toyota", Some("camry")), 1);
        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.last_search_context().is_none());
        assert!(memory.cars_for_comparison().is_empty());
        assert_eq!(memory.summary(), "No conversation history");
    }

    #[test]
    fn test_truncate_chars_unicode_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }
}
