//! Search gateway: validation, dispatch and result shaping.
//!
//! One method per search mode. Each validates its input before touching the
//! backend, issues one call (two for paged full-text search: count, then
//! window), maps the rows and enforces the configured size bounds on the
//! way out.
//!
//! The gateway holds no mutable state; a single instance behind an `Arc` is
//! shared by every request.

use std::sync::Arc;

use crate::backend::SearchBackend;
use crate::config::LimitsConfig;
use crate::error::{Result, SearchError};
use crate::mapper;
use crate::models::{ResultPage, SearchQuery, SearchResult, SpellingSuggestion, Suggestion};
use crate::paging::PageWindow;

pub struct SearchGateway {
    backend: Arc<dyn SearchBackend>,
    limits: LimitsConfig,
}

impl SearchGateway {
    pub fn new(backend: Arc<dyn SearchBackend>, limits: LimitsConfig) -> Self {
        Self { backend, limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Paged full-text search across payments, deposits and loans.
    ///
    /// Issues a count call and then a windowed fetch, in that order. The
    /// returned `total_count` is advisory (see [`PageWindow::reconcile_total`]).
    pub async fn search(&self, query: &SearchQuery) -> Result<ResultPage> {
        let text = required_text(query.text.as_deref(), SearchError::InvalidQuery)?;
        let window = PageWindow::new(query.page, query.page_size, &self.limits)?;

        let types = query.entity_types();
        if types.is_empty() {
            tracing::debug!("All entity types excluded, returning empty page");
            return Ok(ResultPage::empty(window.index, window.size));
        }

        let measured = self.backend.count_all(text, &types).await?;
        let rows = self
            .backend
            .search_all(text, &types, window.size, window.offset)
            .await?;
        let mut items = mapper::search_results(&rows)?;

        if items.len() as u64 > window.size {
            tracing::warn!(
                returned = items.len(),
                limit = window.size,
                "Backend returned more rows than requested, truncating"
            );
            items.truncate(window.size as usize);
        }
        let expected = window.expected_len(measured);
        if items.len() as u64 != expected {
            tracing::debug!(
                expected,
                returned = items.len(),
                measured,
                "Window length differs from measured count"
            );
        }
        let total = window.reconcile_total(measured, items.len());

        tracing::debug!(
            page = window.index,
            size = window.size,
            offset = window.offset,
            returned = items.len(),
            total,
            "Full-text search complete"
        );
        Ok(ResultPage::new(items, total, window.index, window.size))
    }

    /// Prefix completions. `limit` is clamped to `[1, max_autocomplete_limit]`.
    pub async fn autocomplete(&self, prefix: &str, limit: i64) -> Result<Vec<Suggestion>> {
        let prefix = required_text(Some(prefix), SearchError::InvalidPrefix)?;
        let limit = clamp_limit(limit, self.limits.max_autocomplete_limit);

        let rows = self.backend.autocomplete(prefix, limit).await?;
        let mut suggestions = mapper::suggestions(&rows)?;
        suggestions.truncate(limit as usize);

        tracing::debug!(limit, returned = suggestions.len(), "Autocomplete complete");
        Ok(suggestions)
    }

    /// Spelling corrections, most similar first.
    ///
    /// The backend is not relied on for ordering: results are re-sorted by
    /// descending similarity. The sort is stable, so equal similarities keep
    /// backend order.
    pub async fn spelling_suggestions(
        &self,
        term: &str,
        limit: i64,
    ) -> Result<Vec<SpellingSuggestion>> {
        let term = required_text(Some(term), SearchError::InvalidQuery)?;
        let limit = clamp_limit(limit, self.limits.max_spelling_limit);

        let rows = self.backend.spelling_suggestions(term, limit).await?;
        let mut suggestions = mapper::spelling_suggestions(&rows)?;
        sort_by_similarity(&mut suggestions);
        suggestions.truncate(limit as usize);

        tracing::debug!(limit, returned = suggestions.len(), "Spelling suggestions complete");
        Ok(suggestions)
    }

    /// Trigram fuzzy search. Results carry only entity identity and rank.
    pub async fn fuzzy_search(&self, term: &str, threshold: f32) -> Result<Vec<SearchResult>> {
        let term = required_text(Some(term), SearchError::InvalidQuery)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SearchError::InvalidThreshold(format!(
                "threshold must be within [0, 1], got {threshold}"
            )));
        }

        let rows = self.backend.fuzzy_search(term, threshold).await?;
        let mut results = mapper::fuzzy_results(&rows)?;

        let cap = self.limits.max_fuzzy_results as usize;
        if results.len() > cap {
            tracing::debug!(returned = results.len(), cap, "Capping fuzzy results");
            results.truncate(cap);
        }
        Ok(results)
    }
}

/// Trimmed, non-blank text or the given validation error.
fn required_text(text: Option<&str>, err: fn(String) -> SearchError) -> Result<&str> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(err("search text must not be empty".to_string())),
    }
}

fn clamp_limit(limit: i64, max: u32) -> u32 {
    limit.clamp(1, i64::from(max.max(1))) as u32
}

fn sort_by_similarity(suggestions: &mut [SpellingSuggestion]) {
    suggestions.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}
