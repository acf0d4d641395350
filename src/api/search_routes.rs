//! Search API endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/search` - Paged full-text search
//! - `GET /api/search/autocomplete?prefix=&limit=` - Prefix suggestions (default limit 10)
//! - `GET /api/search/spelling?term=&limit=` - Spelling corrections (default limit 5)
//! - `GET /api/search/fuzzy?query=&threshold=` - Trigram fuzzy search (default threshold 0.3)

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use super::error::AppError;
use crate::gateway::SearchGateway;
use crate::models::{
    AutocompleteResponse, ResultPage, SearchQuery, SearchResult, SpellingCorrectionResponse,
    SuggestionEnvelope,
};

// ============================================================================
// Query parameters
// ============================================================================

/// Missing text parameters deserialize as empty so they are rejected by the
/// gateway with the same error body as blank ones.
#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_autocomplete_limit")]
    pub limit: i64,
}

fn default_autocomplete_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct SpellingParams {
    #[serde(default)]
    pub term: String,
    #[serde(default = "default_spelling_limit")]
    pub limit: i64,
}

fn default_spelling_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct FuzzyParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    0.3
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/search
async fn search(
    Extension(gateway): Extension<Arc<SearchGateway>>,
    body: Result<Json<SearchQuery>, JsonRejection>,
) -> Result<Json<ResultPage>, AppError> {
    let Json(query) = body?;
    let page = gateway.search(&query).await?;
    Ok(Json(page))
}

/// GET /api/search/autocomplete
async fn autocomplete(
    Extension(gateway): Extension<Arc<SearchGateway>>,
    params: Result<Query<AutocompleteParams>, QueryRejection>,
) -> Result<Json<AutocompleteResponse>, AppError> {
    let Query(params) = params?;
    let suggestions = gateway.autocomplete(&params.prefix, params.limit).await?;
    Ok(Json(SuggestionEnvelope {
        suggestions,
        original_query: params.prefix,
    }))
}

/// GET /api/search/spelling
async fn spelling(
    Extension(gateway): Extension<Arc<SearchGateway>>,
    params: Result<Query<SpellingParams>, QueryRejection>,
) -> Result<Json<SpellingCorrectionResponse>, AppError> {
    let Query(params) = params?;
    let suggestions = gateway
        .spelling_suggestions(&params.term, params.limit)
        .await?;
    Ok(Json(SuggestionEnvelope {
        suggestions,
        original_query: params.term,
    }))
}

/// GET /api/search/fuzzy
async fn fuzzy(
    Extension(gateway): Extension<Arc<SearchGateway>>,
    params: Result<Query<FuzzyParams>, QueryRejection>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let Query(params) = params?;
    let results = gateway.fuzzy_search(&params.query, params.threshold).await?;
    Ok(Json(results))
}

// ============================================================================
// Router
// ============================================================================

/// Routes for the search endpoints. Expects an `Extension<Arc<SearchGateway>>`
/// layer to be added by the caller.
pub fn create_search_router() -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/search/autocomplete", get(autocomplete))
        .route("/api/search/spelling", get(spelling))
        .route("/api/search/fuzzy", get(fuzzy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_params_default_threshold() {
        let params: FuzzyParams = serde_json::from_str(r#"{"query":"paymemt"}"#).unwrap();
        assert_eq!(params.query, "paymemt");
        assert!((params.threshold - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_prefix_becomes_empty() {
        let params: AutocompleteParams = serde_json::from_str("{}").unwrap();
        assert!(params.prefix.is_empty());
        assert_eq!(params.limit, 10);
    }

    #[test]
    fn spelling_default_limit() {
        let params: SpellingParams = serde_json::from_str(r#"{"term":"paymnt"}"#).unwrap();
        assert_eq!(params.limit, 5);
    }
}
