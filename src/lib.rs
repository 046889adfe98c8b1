//! # car-assistant
//!
//! A conversational assistant that answers natural-language questions about
//! used-vehicle listings: prices, dealers, and head-to-head comparisons.
//!
//! ## Architecture
//!
//! Each chat turn flows through a fixed pipeline:
//!
//! ```text
//!                          ┌─────────────┐
//!                          │  User Query  │
//!                          └──────┬───────┘
//!                                 │
//!                                 ▼
//!                  ┌───────────────────────────┐
//!                  │   Conversation Memory     │
//!                  │  follow-up → add context  │
//!                  └─────────────┬─────────────┘
//!                                │
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │    Intent Extraction      │
//!                  │  LLM JSON, else keywords  │
//!                  └─────────────┬─────────────┘
//!                                │
//!                 ┌──────────────┴──────────────┐
//!                 │ comparison                  │ otherwise
//!                 ▼                             ▼
//!     ┌───────────────────────┐   ┌───────────────────────────┐
//!     │ Comparison Resolver   │   │  Filter (fuzzy entities)  │
//!     │ filter+rank per item  │   │  maker → model → year → $ │
//!     │ fixed-template reply  │   └─────────────┬─────────────┘
//!     └───────────┬───────────┘                 │
//!                 │                             ▼
//!                 │               ┌───────────────────────────┐
//!                 │               │   Ranking (weighted sum)  │
//!                 │               │   keep top N              │
//!                 │               └─────────────┬─────────────┘
//!                 │                             │
//!                 │                             ▼
//!                 │               ┌───────────────────────────┐
//!                 │               │   Response Synthesis      │
//!                 │               │   LLM, else apology       │
//!                 │               └─────────────┬─────────────┘
//!                 └──────────────┬──────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │   Record turn in memory   │
//!                  └───────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, catalog, thresholds, and LLM settings
//! - [`models`] - Shared data types: `CatalogRecord`, `IntentRecord`, `ScoredVehicle`, request/response types
//! - [`catalog`] - CSV loading, normalization, and the manufacturer → models index
//! - [`resolve`] - Fuzzy manufacturer/model resolution over the index
//! - [`memory`] - Bounded conversation history and last-search context
//! - [`llm::oracle`] - Chat-completion client for Ollama or OpenAI-compatible APIs
//! - [`llm::intent`] - Structured intent extraction with a keyword fallback
//! - [`llm::synthesis`] - Natural-language reply generation with an apology fallback
//! - [`search::filter`] - Ordered catalog predicates from an intent record
//! - [`search::rank`] - Weighted relevance scoring and top-N selection
//! - [`compare`] - Two-car price comparisons answered from the catalog
//! - [`assistant`] - One turn end to end
//! - [`api`] - Axum HTTP handlers for chat, history, health, and catalog reload
//! - [`state`] - Shared application state holding the catalog, assistant, and memory

pub mod api;
pub mod assistant;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod models;
pub mod resolve;
pub mod search;
pub mod state;
