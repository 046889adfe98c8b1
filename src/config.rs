use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tabular vehicle/dealer source loaded at startup
    pub csv_path: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Number of turns kept in conversation memory
    pub max_history: usize,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Fuzzy-match acceptance thresholds (0-100)
    pub thresholds: MatchThresholds,
    /// Dealer ranking weights and result bound
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" or "ollama"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for intent extraction and response synthesis
    pub chat_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (capped at 120). A timeout counts as an oracle failure.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub intent_max_tokens: u32,
    pub response_max_tokens: u32,
}

/// Minimum similarity score a candidate must exceed to be accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub manufacturer: f64,
    pub model: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_n: usize,
    pub weights: RankingWeights,
}

/// Sub-score weights. They sum to 1.0 so the final score stays in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankingWeights {
    pub price: f64,
    pub location: f64,
    pub contact: f64,
    pub seller_name: f64,
    pub recency: f64,
    /// No listing timestamps exist, so every record gets the same recency sub-score.
    pub recency_constant: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("car_data.csv"),
            bind_addr: "127.0.0.1:5000".to_string(),
            max_history: 10,
            llm: LlmConfig::default(),
            thresholds: MatchThresholds::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o".to_string(),
            api_key: None,
            timeout_secs: 30,
            temperature: 0.0,
            intent_max_tokens: 300,
            response_max_tokens: 512,
        }
    }
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            manufacturer: 70.0,
            model: 60.0,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            weights: RankingWeights::default(),
        }
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            price: 0.30,
            location: 0.25,
            contact: 0.20,
            seller_name: 0.15,
            recency: 0.10,
            recency_constant: 0.7,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CAR_ASSISTANT_CSV_PATH") {
            config.csv_path = PathBuf::from(path);
        }
        if let Ok(addr) = std::env::var("CAR_ASSISTANT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("CAR_ASSISTANT_MAX_HISTORY") {
            if let Ok(v) = val.parse::<usize>() {
                config.max_history = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("CAR_ASSISTANT_TOP_N") {
            if let Ok(v) = val.parse() {
                config.ranking.top_n = v;
            }
        }
        if let Ok(val) = std::env::var("CAR_ASSISTANT_MANUFACTURER_THRESHOLD") {
            if let Ok(v) = val.parse() {
                config.thresholds.manufacturer = v;
            }
        }
        if let Ok(val) = std::env::var("CAR_ASSISTANT_MODEL_THRESHOLD") {
            if let Ok(v) = val.parse() {
                config.thresholds.model = v;
            }
        }

        // LLM config
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY")) {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.llm.timeout_secs = v.min(120); // Cap at 120s
            }
        }

        config
    }
}
