//! Response Synthesizer: ranked vehicles + conversation → natural-language reply.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::OracleError;
use crate::llm::oracle::{Oracle, Prompt};
use crate::models::{IntentRecord, ScoredVehicle};

pub const APOLOGY_MESSAGE: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again later.";

/// Everything a reply is allowed to draw on.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub query: &'a str,
    pub intent: &'a IntentRecord,
    pub vehicles: &'a [ScoredVehicle],
    /// Rendered recent turns (see [`crate::memory::ConversationMemory::context`])
    pub conversation: &'a str,
}

#[async_trait]
pub trait Synthesize: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError>;
}

pub struct OracleSynthesizer {
    oracle: Arc<dyn Oracle>,
    max_tokens: u32,
}

impl OracleSynthesizer {
    pub fn new(oracle: Arc<dyn Oracle>, max_tokens: u32) -> Self {
        Self { oracle, max_tokens }
    }
}

#[async_trait]
impl Synthesize for OracleSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError> {
        let prompt = Prompt {
            system: build_system_prompt(),
            user: build_user_prompt(request),
            max_tokens: self.max_tokens,
        };
        self.oracle.complete(&prompt).await
    }
}

/// Always declines; used when no language model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSynthesizer;

#[async_trait]
impl Synthesize for StaticSynthesizer {
    async fn synthesize(&self, _request: &SynthesisRequest<'_>) -> Result<String, OracleError> {
        Ok(APOLOGY_MESSAGE.to_string())
    }
}

pub struct ResponseSynthesizer {
    inner: Box<dyn Synthesize>,
}

impl ResponseSynthesizer {
    pub fn new(inner: impl Synthesize + 'static) -> Self {
        Self { inner: Box::new(inner) }
    }

    /// Never fails: an oracle error degrades to [`APOLOGY_MESSAGE`].
    pub async fn render(&self, request: &SynthesisRequest<'_>) -> String {
        match self.inner.synthesize(request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Response synthesis failed: {e}");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}

fn build_system_prompt() -> String {
    String::from(
        "You are a helpful car dealership assistant in Ghana. Using the provided data and the \
         conversation history, answer the user's question about car prices and dealers.\n\
         Guidelines:\n\
         - Start with a direct answer.\n\
         - Give prices in Ghana Cedis (GHS), with thousands separators.\n\
         - List the top dealers with their contact information.\n\
         - Include location, mileage, fuel type and gearbox when available.\n\
         - If this is a follow-up question, refer back to the earlier query.\n\
         - If nothing was found, suggest broader search terms or alternatives.\n\
         - Keep it conversational and reasonably short.\n\
         Always end by offering to help with more specific questions.",
    )
}

fn build_user_prompt(request: &SynthesisRequest<'_>) -> String {
    let vehicles: Vec<_> = request
        .vehicles
        .iter()
        .map(|s| {
            let v = &s.vehicle;
            json!({
                "manufacturer": v.manufacturer,
                "model": v.model,
                "year": v.year,
                "price_range": v.price_range_label(),
                "fuel": v.fuel,
                "gearbox": v.gearbox,
                "dealer_city": v.dealer.city,
                "dealer_region": v.dealer.region,
                "dealer_contact": v.dealer.contact,
                "dealer_seller": v.dealer.seller,
                "mileage": v.mileage,
            })
        })
        .collect();

    let context = json!({
        "user_query": request.query,
        "intent": request.intent,
        "vehicles_found": request.vehicles.len(),
        "top_vehicles": vehicles,
    });
    let context = serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string());

    format!(
        "{}\n\nCurrent User Query: {}\n\nContext Data: {}\n\n\
         Generate a helpful response based on this information and conversation history.",
        request.conversation, request.query, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogRecord, Dealer, IntentKind};

    struct Echo;

    #[async_trait]
    impl Oracle for Echo {
        async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError> {
            Ok(prompt.user.clone())
        }
    }

    struct Down;

    #[async_trait]
    impl Oracle for Down {
        async fn complete(&self, _prompt: &Prompt) -> Result<String, OracleError> {
            Err(OracleError::Status {
                status: 503,
                body: "overloaded".into(),
            })
        }
    }

    fn camry() -> ScoredVehicle {
        ScoredVehicle {
            vehicle: CatalogRecord {
                manufacturer: "toyota".into(),
                model: "camry".into(),
                year: "2018".into(),
                price: Some(85000.0),
                lower_bound: Some(80000.0),
                upper_bound: Some(90000.0),
                mileage: "45000".into(),
                fuel: "petrol".into(),
                gearbox: "automatic".into(),
                origin: "usa".into(),
                dealer: Dealer {
                    seller: "Kwame Autos".into(),
                    region: "greater accra".into(),
                    city: "accra".into(),
                    contact: "0241234567".into(),
                },
            },
            score: 0.8,
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_vehicles_and_history() {
        let synth = ResponseSynthesizer::new(OracleSynthesizer::new(Arc::new(Echo), 512));
        let intent = IntentRecord::new(IntentKind::PriceInquiry);
        let vehicles = vec![camry()];
        let text = synth
            .render(&SynthesisRequest {
                query: "price of toyota camry",
                intent: &intent,
                vehicles: &vehicles,
                conversation: "Previous conversation:\nUser: hi\n",
            })
            .await;
        assert!(text.starts_with("Previous conversation:"));
        assert!(text.contains("Current User Query: price of toyota camry"));
        assert!(text.contains("80,000 - 90,000 GHS"));
        assert!(text.contains("Kwame Autos"));
        assert!(text.contains("\"vehicles_found\": 1"));
        assert!(text.contains("\"intent\": \"price_inquiry\""));
    }

    #[tokio::test]
    async fn test_oracle_failure_yields_apology() {
        let synth = ResponseSynthesizer::new(OracleSynthesizer::new(Arc::new(Down), 512));
        let intent = IntentRecord::default();
        let text = synth
            .render(&SynthesisRequest {
                query: "anything",
                intent: &intent,
                vehicles: &[],
                conversation: "",
            })
            .await;
        assert_eq!(text, APOLOGY_MESSAGE);
    }

    #[test]
    fn test_system_prompt_mentions_currency() {
        assert!(build_system_prompt().contains("GHS"));
    }
}
