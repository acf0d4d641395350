//! In-memory implementation of [`SearchBackend`].
//!
//! Serves fixture rows that are already in backend column order. It does no
//! text matching of its own for `search_all`: the seeded rows are the match
//! set for any term. It does honour everything the gateway relies on:
//! rank-descending order, limit/offset windowing, entity-type filtering,
//! prefix filtering for autocomplete and threshold filtering for fuzzy search.
//!
//! Used by the test suites.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{ColumnValue, Row, SearchBackend};
use crate::error::{Result, SearchError};
use crate::models::EntityType;

/// Column positions inside `search_all` / `fuzzy_search` rows.
const SEARCH_ALL_RANK: usize = 10;
const FUZZY_RANK: usize = 3;

#[derive(Default)]
pub struct InMemoryBackend {
    search_rows: Vec<Row>,
    autocomplete_rows: Vec<Row>,
    spelling_rows: Vec<Row>,
    fuzzy_rows: Vec<Row>,
    /// Overrides the measured count to simulate data changing between the
    /// count and the fetch.
    count_override: Option<u64>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_rows(mut self, rows: Vec<Row>) -> Self {
        self.search_rows = rows;
        self
    }

    pub fn with_autocomplete_rows(mut self, rows: Vec<Row>) -> Self {
        self.autocomplete_rows = rows;
        self
    }

    pub fn with_spelling_rows(mut self, rows: Vec<Row>) -> Self {
        self.spelling_rows = rows;
        self
    }

    pub fn with_fuzzy_rows(mut self, rows: Vec<Row>) -> Self {
        self.fuzzy_rows = rows;
        self
    }

    pub fn with_count_override(mut self, count: u64) -> Self {
        self.count_override = Some(count);
        self
    }

    /// Make every subsequent call fail with `BackendUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of backend calls served (including failed ones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::BackendUnavailable(
                "in-memory backend marked unavailable".into(),
            ));
        }
        Ok(())
    }

    /// Rows of the selected types, highest rank first. Sorting is stable so
    /// equal ranks keep fixture order. Rows whose type cell does not parse are
    /// kept so that shape problems reach the mapper.
    fn matching(&self, types: &[EntityType]) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .search_rows
            .iter()
            .filter(|row| {
                match row
                    .first()
                    .and_then(ColumnValue::as_text)
                    .and_then(|t| t.parse::<EntityType>().ok())
                {
                    Some(t) => types.contains(&t),
                    None => true,
                }
            })
            .collect();
        rows.sort_by(|a, b| rank_of(b, SEARCH_ALL_RANK).total_cmp(&rank_of(a, SEARCH_ALL_RANK)));
        rows
    }
}

fn rank_of(row: &[ColumnValue], idx: usize) -> f64 {
    row.get(idx)
        .and_then(ColumnValue::as_f64)
        .unwrap_or(f64::NEG_INFINITY)
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn count_all(&self, _term: &str, types: &[EntityType]) -> Result<u64> {
        self.enter()?;
        Ok(self
            .count_override
            .unwrap_or_else(|| self.matching(types).len() as u64))
    }

    async fn search_all(
        &self,
        _term: &str,
        types: &[EntityType],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Row>> {
        self.enter()?;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .matching(types)
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn autocomplete(&self, prefix: &str, limit: u32) -> Result<Vec<Row>> {
        self.enter()?;
        let prefix = prefix.to_lowercase();
        Ok(self
            .autocomplete_rows
            .iter()
            .filter(|row| {
                row.first()
                    .and_then(ColumnValue::as_text)
                    .map(|s| s.to_lowercase().starts_with(&prefix))
                    .unwrap_or(true)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    /// Returned in fixture order; ordering by similarity is left to callers.
    async fn spelling_suggestions(&self, _term: &str, limit: u32) -> Result<Vec<Row>> {
        self.enter()?;
        Ok(self
            .spelling_rows
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fuzzy_search(&self, _term: &str, threshold: f32) -> Result<Vec<Row>> {
        self.enter()?;
        let threshold = f64::from(threshold);
        Ok(self
            .fuzzy_rows
            .iter()
            .filter(|row| {
                row.get(FUZZY_RANK)
                    .and_then(ColumnValue::as_f64)
                    .map(|rank| rank >= threshold)
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(kind: &str, id: i64, rank: f64) -> Row {
        let mut row: Row = vec![kind.into(), id.into(), format!("ID-{id}").into()];
        row.extend(std::iter::repeat(ColumnValue::Null).take(7));
        row.push(rank.into());
        row
    }

    #[tokio::test]
    async fn search_all_orders_by_rank_and_windows() {
        let backend = InMemoryBackend::new().with_search_rows(vec![
            hit("payment", 1, 0.1),
            hit("loan", 2, 0.9),
            hit("deposit", 3, 0.5),
        ]);
        let rows = backend
            .search_all("x", &EntityType::ALL, 2, 0)
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r[1].clone()).collect();
        assert_eq!(ids, vec![ColumnValue::Int(2), ColumnValue::Int(3)]);

        let rows = backend
            .search_all("x", &EntityType::ALL, 2, 2)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], ColumnValue::Int(1));
    }

    #[tokio::test]
    async fn type_filter_applies_to_count_and_fetch() {
        let backend = InMemoryBackend::new().with_search_rows(vec![
            hit("payment", 1, 0.1),
            hit("LOAN", 2, 0.9),
            hit("deposit", 3, 0.5),
        ]);
        let types = [EntityType::Loan];
        assert_eq!(backend.count_all("x", &types).await.unwrap(), 1);
        let rows = backend.search_all("x", &types, 10, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], ColumnValue::Int(2));
    }

    #[tokio::test]
    async fn autocomplete_matches_prefix_case_insensitively() {
        let backend = InMemoryBackend::new().with_autocomplete_rows(vec![
            vec!["Acme Corp".into(), "payment".into()],
            vec!["Globex".into(), "loan".into()],
            vec!["acme holdings".into(), "deposit".into()],
        ]);
        let rows = backend.autocomplete("ACM", 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        let rows = backend.autocomplete("acm", 1).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn fuzzy_applies_threshold() {
        let backend = InMemoryBackend::new().with_fuzzy_rows(vec![
            vec!["payment".into(), 1i64.into(), "TXN-1".into(), 0.8f64.into()],
            vec!["loan".into(), 2i64.into(), "LN-2".into(), 0.2f64.into()],
        ]);
        assert_eq!(backend.fuzzy_search("x", 0.3).await.unwrap().len(), 1);
        assert_eq!(backend.fuzzy_search("x", 0.0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unavailable_fails_every_call() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true);
        let err = backend.count_all("x", &EntityType::ALL).await.unwrap_err();
        assert!(matches!(err, SearchError::BackendUnavailable(_)));
        assert_eq!(backend.calls(), 1);
    }
}
