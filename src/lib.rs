//! Cash-management search gateway
//!
//! A REST front for the PostgreSQL search functions of the cash-management
//! schema. Ranking, trigram similarity and spelling distance are computed by
//! the database; this crate validates requests, dispatches them to one of
//! four backend functions, maps the returned rows and shapes the response.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  api        axum routes, AppError → status   │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │  gateway    validation, paging, limits       │
//! └──────────────────────────────────────────────┘
//!           │                       ▲
//!           ▼                       │
//! ┌──────────────────────┐  ┌───────────────────┐
//! │  backend  (trait)    │─▶│  mapper           │
//! │  Postgres / memory   │  │  rows → results   │
//! └──────────────────────┘  └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use cash_search::{api, PgSearchBackend, SearchConfig, SearchGateway};
//!
//! let config = SearchConfig::load()?;
//! let backend = PgSearchBackend::connect(&config.database).await?;
//! let gateway = Arc::new(SearchGateway::new(Arc::new(backend), config.limits.clone()));
//! let app = api::build_router(gateway);
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mapper;
pub mod models;
pub mod paging;

// Re-export main types
pub use backend::{ColumnValue, InMemoryBackend, PgSearchBackend, Row, SearchBackend};
pub use config::{ConfigError, DatabaseConfig, LimitsConfig, SearchConfig, ServerConfig};
pub use error::{Result, SearchError};
pub use gateway::SearchGateway;
pub use models::{
    AutocompleteResponse, EntityType, ResultPage, SearchQuery, SearchResult,
    SpellingCorrectionResponse, SpellingSuggestion, Suggestion, SuggestionEnvelope,
};
pub use paging::PageWindow;
