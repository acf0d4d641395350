//! Search backend abstraction
//!
//! The ranking, trigram similarity and spelling distance all live in the
//! database as four set-returning functions. This module defines the
//! `SearchBackend` trait that the gateway talks to, so that any engine
//! honouring those function contracts (name, inputs, column order) can be
//! swapped in.
//!
//! Rows come back untyped: an ordered list of [`ColumnValue`] cells. Turning
//! them into typed results is the job of [`crate::mapper`].

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::EntityType;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBackend;
pub use postgres::PgSearchBackend;

/// Backend function names, used in error messages and logs.
pub const SEARCH_ALL: &str = "search_all";
pub const AUTOCOMPLETE: &str = "autocomplete";
pub const SPELLING_SUGGESTIONS: &str = "spelling_suggestions";
pub const FUZZY_SEARCH: &str = "fuzzy_search";

/// A single untyped cell as delivered by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Timestamp(NaiveDateTime),
}

impl ColumnValue {
    /// Short type name used when logging the shape of a bad row.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for ColumnValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<Decimal> for ColumnValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<NaiveDateTime> for ColumnValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One result row, cells in backend column order.
pub type Row = Vec<ColumnValue>;

/// Renders a row's cell kinds, e.g. `[text, int, null]`.
pub fn describe_shape(row: &[ColumnValue]) -> String {
    let kinds: Vec<&str> = row.iter().map(ColumnValue::kind).collect();
    format!("[{}]", kinds.join(", "))
}

/// The four search functions plus the count used for page metadata.
///
/// `types` restricts `search_all` rows to the given entity types. The
/// gateway never passes an empty slice; passing all three types means no
/// restriction. Count and fetch must apply the same restriction.
///
/// Implementations must be Send + Sync; one instance is shared by every
/// in-flight request.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// `SELECT COUNT(*) FROM search_all(term)`
    async fn count_all(&self, term: &str, types: &[EntityType]) -> Result<u64>;

    /// Ranked window over `search_all(term)`, highest rank first.
    async fn search_all(
        &self,
        term: &str,
        types: &[EntityType],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Row>>;

    /// `autocomplete(prefix, limit)`: suggestion, source
    async fn autocomplete(&self, prefix: &str, limit: u32) -> Result<Vec<Row>>;

    /// `spelling_suggestions(term, limit)`: suggestion, similarity
    async fn spelling_suggestions(&self, term: &str, limit: u32) -> Result<Vec<Row>>;

    /// `fuzzy_search(term, threshold)`: entityType, entityId, primaryIdentifier, rank
    async fn fuzzy_search(&self, term: &str, threshold: f32) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_shape_lists_kinds() {
        let row: Row = vec!["payment".into(), 7i64.into(), ColumnValue::Null, 0.5f64.into()];
        assert_eq!(describe_shape(&row), "[text, int, null, float]");
    }

    #[test]
    fn option_converts_to_null() {
        let none: Option<&str> = None;
        assert_eq!(ColumnValue::from(none), ColumnValue::Null);
        assert_eq!(
            ColumnValue::from(Some("EUR")),
            ColumnValue::Text("EUR".into())
        );
    }

    #[test]
    fn as_f64_widens_ints() {
        assert_eq!(ColumnValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ColumnValue::Text("3".into()).as_f64(), None);
    }
}
