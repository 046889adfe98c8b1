use anyhow::Context;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::assistant::Assistant;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::DataLoadError;
use crate::llm::oracle::LlmClient;
use crate::memory::ConversationMemory;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Swapped wholesale on reload; turns hold their own snapshot.
    catalog: Arc<RwLock<Arc<Catalog>>>,
    pub assistant: Arc<Assistant>,
    /// One conversation. The async mutex serializes its turns.
    pub memory: Arc<tokio::sync::Mutex<ConversationMemory>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let catalog = Catalog::load(&config.csv_path)
            .with_context(|| format!("Failed to load catalog from {}", config.csv_path.display()))?;

        let assistant = if config.llm.provider == "none" {
            tracing::warn!("LLM disabled: using keyword intents and a fixed reply");
            Assistant::offline(&config)
        } else {
            let client = LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?;
            Assistant::new(&config, Arc::new(client))
        };

        Ok(Self::with_parts(config, catalog, assistant))
    }

    pub fn with_parts(config: Config, catalog: Catalog, assistant: Assistant) -> Self {
        let memory = ConversationMemory::new(config.max_history);
        Self {
            config,
            catalog: Arc::new(RwLock::new(Arc::new(catalog))),
            assistant: Arc::new(assistant),
            memory: Arc::new(tokio::sync::Mutex::new(memory)),
        }
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }

    /// Rebuild the catalog from the configured source and swap it in.
    /// On failure the previous catalog stays in place.
    pub fn reload_catalog(&self) -> Result<usize, DataLoadError> {
        let fresh = Catalog::load(&self.config.csv_path)?;
        let records = fresh.len();
        *self.catalog.write() = Arc::new(fresh);
        Ok(records)
    }
}
