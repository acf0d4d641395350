//! Row mapping: untyped backend rows into typed results.
//!
//! Each backend function has a fixed column-position contract:
//!
//! | function               | columns                                                   |
//! |------------------------|-----------------------------------------------------------|
//! | `search_all`           | entityType, entityId, primaryIdentifier, date, amount,    |
//! |                        | currency, status, partyInfo, description,                 |
//! |                        | referenceNumber, rank                                     |
//! | `autocomplete`         | suggestion, source                                        |
//! | `spelling_suggestions` | suggestion, similarity                                    |
//! | `fuzzy_search`         | entityType, entityId, primaryIdentifier, rank             |
//!
//! Mapping is all-or-nothing per batch: the first bad row aborts the whole
//! batch with `MalformedRow`. A short row or an unconvertible cell means the
//! database functions and this service disagree about the schema, and that
//! has to surface instead of being papered over with partial results.
//!
//! Trailing extra columns are ignored.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::backend::{
    describe_shape, ColumnValue, Row, AUTOCOMPLETE, FUZZY_SEARCH, SEARCH_ALL, SPELLING_SUGGESTIONS,
};
use crate::error::{Result, SearchError};
use crate::models::{EntityType, SearchResult, SpellingSuggestion, Suggestion};

pub const SEARCH_ALL_COLUMNS: usize = 11;
pub const AUTOCOMPLETE_COLUMNS: usize = 2;
pub const SPELLING_COLUMNS: usize = 2;
pub const FUZZY_COLUMNS: usize = 4;

// ============================================================================
// Batch mapping
// ============================================================================

pub fn search_results(rows: &[Row]) -> Result<Vec<SearchResult>> {
    map_rows(SEARCH_ALL, rows, search_result)
}

pub fn fuzzy_results(rows: &[Row]) -> Result<Vec<SearchResult>> {
    map_rows(FUZZY_SEARCH, rows, fuzzy_result)
}

pub fn suggestions(rows: &[Row]) -> Result<Vec<Suggestion>> {
    map_rows(AUTOCOMPLETE, rows, suggestion)
}

pub fn spelling_suggestions(rows: &[Row]) -> Result<Vec<SpellingSuggestion>> {
    map_rows(SPELLING_SUGGESTIONS, rows, spelling_suggestion)
}

fn map_rows<T>(
    function: &'static str,
    rows: &[Row],
    map: fn(&[ColumnValue]) -> Result<T>,
) -> Result<Vec<T>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            map(row).inspect_err(|e| {
                tracing::error!(
                    function,
                    row_index = index,
                    shape = %describe_shape(row),
                    error = %e,
                    "Malformed row from search backend"
                );
            })
        })
        .collect()
}

// ============================================================================
// Single-row mapping
// ============================================================================

/// Map a `search_all` row (full shape).
pub fn search_result(row: &[ColumnValue]) -> Result<SearchResult> {
    let cells = Cells::new(SEARCH_ALL, row, SEARCH_ALL_COLUMNS)?;
    Ok(SearchResult {
        entity_type: cells.entity_type(0)?,
        entity_id: cells.int(1, "entityId")?,
        primary_identifier: cells.text(2, "primaryIdentifier")?,
        occurred_at: cells.opt_timestamp(3, "date")?,
        amount: cells.opt_decimal(4, "amount")?,
        currency: cells.opt_text(5, "currency")?,
        status: cells.opt_text(6, "status")?,
        party_info: cells.opt_text(7, "partyInfo")?,
        description: cells.opt_text(8, "description")?,
        reference_number: cells.opt_text(9, "referenceNumber")?,
        rank: cells.float(10, "rank")?,
    })
}

/// Map a `fuzzy_search` row (reduced shape).
pub fn fuzzy_result(row: &[ColumnValue]) -> Result<SearchResult> {
    let cells = Cells::new(FUZZY_SEARCH, row, FUZZY_COLUMNS)?;
    Ok(SearchResult::reduced(
        cells.entity_type(0)?,
        cells.int(1, "entityId")?,
        cells.text(2, "primaryIdentifier")?,
        cells.float(3, "rank")?,
    ))
}

pub fn suggestion(row: &[ColumnValue]) -> Result<Suggestion> {
    let cells = Cells::new(AUTOCOMPLETE, row, AUTOCOMPLETE_COLUMNS)?;
    Ok(Suggestion {
        text: cells.text(0, "suggestion")?,
        source: cells.text(1, "source")?,
    })
}

pub fn spelling_suggestion(row: &[ColumnValue]) -> Result<SpellingSuggestion> {
    let cells = Cells::new(SPELLING_SUGGESTIONS, row, SPELLING_COLUMNS)?;
    let similarity = cells.float(1, "similarity")?;
    if !(0.0..=1.0).contains(&similarity) {
        return Err(cells.err(format!("similarity {similarity} outside [0, 1]")));
    }
    Ok(SpellingSuggestion {
        text: cells.text(0, "suggestion")?,
        similarity,
    })
}

// ============================================================================
// Inverse mapping (typed result back into column order)
// ============================================================================

pub fn search_result_to_row(result: &SearchResult) -> Row {
    vec![
        result.entity_type.as_str().into(),
        result.entity_id.into(),
        result.primary_identifier.clone().into(),
        result.occurred_at.into(),
        result.amount.into(),
        result.currency.clone().into(),
        result.status.clone().into(),
        result.party_info.clone().into(),
        result.description.clone().into(),
        result.reference_number.clone().into(),
        result.rank.into(),
    ]
}

pub fn fuzzy_result_to_row(result: &SearchResult) -> Row {
    vec![
        result.entity_type.as_str().into(),
        result.entity_id.into(),
        result.primary_identifier.clone().into(),
        result.rank.into(),
    ]
}

pub fn suggestion_to_row(suggestion: &Suggestion) -> Row {
    vec![
        suggestion.text.clone().into(),
        suggestion.source.clone().into(),
    ]
}

pub fn spelling_suggestion_to_row(suggestion: &SpellingSuggestion) -> Row {
    vec![suggestion.text.clone().into(), suggestion.similarity.into()]
}

// ============================================================================
// Cell access
// ============================================================================

/// Positional, typed access to one row of a known backend function.
struct Cells<'a> {
    function: &'static str,
    row: &'a [ColumnValue],
}

impl<'a> Cells<'a> {
    fn new(function: &'static str, row: &'a [ColumnValue], required: usize) -> Result<Self> {
        if row.len() < required {
            return Err(SearchError::malformed(
                function,
                format!("expected {required} columns, got {}", row.len()),
            ));
        }
        Ok(Self { function, row })
    }

    fn err(&self, reason: String) -> SearchError {
        SearchError::malformed(self.function, reason)
    }

    fn mismatch(&self, idx: usize, name: &str, expected: &str) -> SearchError {
        self.err(format!(
            "column {idx} ({name}): expected {expected}, got {}",
            self.row[idx].kind()
        ))
    }

    fn text(&self, idx: usize, name: &str) -> Result<String> {
        self.opt_text(idx, name)?
            .ok_or_else(|| self.err(format!("column {idx} ({name}) is null")))
    }

    fn opt_text(&self, idx: usize, name: &str) -> Result<Option<String>> {
        match &self.row[idx] {
            ColumnValue::Null => Ok(None),
            ColumnValue::Text(s) => Ok(Some(s.clone())),
            _ => Err(self.mismatch(idx, name, "text")),
        }
    }

    fn entity_type(&self, idx: usize) -> Result<EntityType> {
        let raw = self.text(idx, "entityType")?;
        raw.parse()
            .map_err(|e: String| self.err(format!("column {idx} (entityType): {e}")))
    }

    /// Any integral number; fractional or textual ids are rejected.
    fn int(&self, idx: usize, name: &str) -> Result<i64> {
        match &self.row[idx] {
            ColumnValue::Int(i) => Ok(*i),
            ColumnValue::Decimal(d) if d.fract().is_zero() => d
                .to_i64()
                .ok_or_else(|| self.err(format!("column {idx} ({name}): {d} out of range"))),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            ColumnValue::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Ok(*f as i64)
            }
            ColumnValue::Float(f) if f.fract() == 0.0 => {
                Err(self.err(format!("column {idx} ({name}): {f} out of range")))
            }
            ColumnValue::Null => Err(self.err(format!("column {idx} ({name}) is null"))),
            _ => Err(self.mismatch(idx, name, "integer")),
        }
    }

    /// Finite numbers only; NaN or infinity would break rank ordering.
    fn float(&self, idx: usize, name: &str) -> Result<f32> {
        let value = match &self.row[idx] {
            ColumnValue::Float(f) => Ok(*f as f32),
            ColumnValue::Int(i) => Ok(*i as f32),
            ColumnValue::Decimal(d) => d
                .to_f32()
                .ok_or_else(|| self.err(format!("column {idx} ({name}): {d} not representable"))),
            ColumnValue::Null => Err(self.err(format!("column {idx} ({name}) is null"))),
            _ => Err(self.mismatch(idx, name, "number")),
        }?;
        if !value.is_finite() {
            return Err(self.err(format!("column {idx} ({name}): {value} is not finite")));
        }
        Ok(value)
    }

    fn opt_decimal(&self, idx: usize, name: &str) -> Result<Option<Decimal>> {
        match &self.row[idx] {
            ColumnValue::Null => Ok(None),
            ColumnValue::Decimal(d) => Ok(Some(*d)),
            ColumnValue::Int(i) => Ok(Some(Decimal::from(*i))),
            ColumnValue::Float(f) => Decimal::from_f64(*f)
                .map(Some)
                .ok_or_else(|| self.err(format!("column {idx} ({name}): {f} not a decimal"))),
            ColumnValue::Text(s) => Decimal::from_str(s.trim())
                .map(Some)
                .map_err(|e| self.err(format!("column {idx} ({name}): '{s}': {e}"))),
            ColumnValue::Timestamp(_) => Err(self.mismatch(idx, name, "decimal")),
        }
    }

    fn opt_timestamp(&self, idx: usize, name: &str) -> Result<Option<NaiveDateTime>> {
        match &self.row[idx] {
            ColumnValue::Null => Ok(None),
            ColumnValue::Timestamp(ts) => Ok(Some(*ts)),
            _ => Err(self.mismatch(idx, name, "timestamp")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap()
    }

    fn full_row() -> Row {
        vec![
            "payment".into(),
            1001i64.into(),
            "TXN-1001".into(),
            ts().into(),
            Decimal::new(250075, 2).into(),
            "EUR".into(),
            "COMPLETED".into(),
            "Acme Corp -> Globex".into(),
            "Wire transfer for invoice 42".into(),
            "REF-42".into(),
            0.0759f64.into(),
        ]
    }

    #[test]
    fn maps_full_search_row() {
        let r = search_result(&full_row()).unwrap();
        assert_eq!(r.entity_type, EntityType::Payment);
        assert_eq!(r.entity_id, 1001);
        assert_eq!(r.primary_identifier, "TXN-1001");
        assert_eq!(r.occurred_at, Some(ts()));
        assert_eq!(r.amount, Some(Decimal::new(250075, 2)));
        assert_eq!(r.currency.as_deref(), Some("EUR"));
        assert_eq!(r.party_info.as_deref(), Some("Acme Corp -> Globex"));
        assert_eq!(r.reference_number.as_deref(), Some("REF-42"));
        assert!((r.rank - 0.0759).abs() < 1e-6);
    }

    #[test]
    fn full_row_round_trips() {
        let row = full_row();
        let typed = search_result(&row).unwrap();
        let back = search_result_to_row(&typed);
        assert_eq!(search_result(&back).unwrap(), typed);
        // Every cell except rank (f64 -> f32 narrowing) survives unchanged.
        assert_eq!(&back[..10], &row[..10]);
    }

    #[test]
    fn optional_columns_may_be_null() {
        let mut row = full_row();
        for cell in row.iter_mut().take(10).skip(3) {
            *cell = ColumnValue::Null;
        }
        let r = search_result(&row).unwrap();
        assert!(r.is_reduced());
    }

    #[test]
    fn row_missing_rank_is_malformed() {
        let mut row = full_row();
        row.pop();
        let err = search_result(&row).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRow { function: "search_all", .. }));
        assert!(err.to_string().contains("expected 11 columns, got 10"));
    }

    #[test]
    fn non_numeric_entity_id_is_malformed() {
        let mut row = full_row();
        row[1] = "abc".into();
        let err = search_result(&row).unwrap_err();
        assert!(err.to_string().contains("entityId"), "{err}");
    }

    #[test]
    fn unknown_entity_type_is_malformed() {
        let mut row = full_row();
        row[0] = "invoice".into();
        assert!(matches!(
            search_result(&row),
            Err(SearchError::MalformedRow { .. })
        ));
    }

    #[test]
    fn amount_accepts_textual_decimal() {
        let mut row = full_row();
        row[4] = "1999.90".into();
        let r = search_result(&row).unwrap();
        assert_eq!(r.amount, Some(Decimal::new(199990, 2)));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut bad = full_row();
        bad.truncate(3);
        let rows = vec![full_row(), bad, full_row()];
        assert!(search_results(&rows).is_err());
        assert_eq!(search_results(&[full_row(), full_row()]).unwrap().len(), 2);
    }

    #[test]
    fn fuzzy_row_yields_reduced_shape() {
        let row: Row = vec!["deposit".into(), 7i64.into(), "ACC-7".into(), 0.42f64.into()];
        let r = fuzzy_result(&row).unwrap();
        assert!(r.is_reduced());
        assert_eq!(r.entity_type, EntityType::Deposit);
        assert_eq!(fuzzy_result(&fuzzy_result_to_row(&r)).unwrap(), r);
    }

    #[test]
    fn fuzzy_row_too_short() {
        let row: Row = vec!["deposit".into(), 7i64.into(), "ACC-7".into()];
        assert!(fuzzy_result(&row).is_err());
    }

    #[test]
    fn integral_float_id_outside_i64_is_malformed() {
        let row: Row = vec!["payment".into(), 1e30f64.into(), "TXN-1".into(), 0.5f64.into()];
        let err = fuzzy_result(&row).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRow { .. }));
        assert!(err.to_string().contains("out of range"));

        let row: Row = vec!["payment".into(), 42.0f64.into(), "TXN-42".into(), 0.5f64.into()];
        assert_eq!(fuzzy_result(&row).unwrap().entity_id, 42);
    }

    #[test]
    fn non_finite_rank_is_malformed() {
        for rank in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            let row: Row = vec!["payment".into(), 1i64.into(), "TXN-1".into(), rank.into()];
            let err = fuzzy_result(&row).unwrap_err();
            assert!(matches!(err, SearchError::MalformedRow { .. }), "{rank}");
        }

        let mut row = full_row();
        row[10] = f64::NAN.into();
        assert!(search_result(&row).is_err());
    }

    #[test]
    fn suggestion_round_trip() {
        let row: Row = vec!["Acme Corp".into(), "payment".into()];
        let s = suggestion(&row).unwrap();
        assert_eq!(s.text, "Acme Corp");
        assert_eq!(suggestion_to_row(&s), row);
    }

    #[test]
    fn spelling_similarity_must_be_in_unit_range() {
        let ok: Row = vec!["payment".into(), 0.5f32.into()];
        let s = spelling_suggestion(&ok).unwrap();
        assert_eq!(spelling_suggestion_to_row(&s), ok);

        let bad: Row = vec!["payment".into(), 1.5f64.into()];
        assert!(spelling_suggestion(&bad).is_err());
        let nan: Row = vec!["payment".into(), f64::NAN.into()];
        assert!(spelling_suggestion(&nan).is_err());
    }

    #[test]
    fn null_required_text_is_malformed() {
        let row: Row = vec![ColumnValue::Null, "payment".into()];
        let err = suggestion(&row).unwrap_err();
        assert!(err.to_string().contains("is null"));
    }
}
