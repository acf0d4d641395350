//! Request and response types for the search gateway.
//!
//! Everything here is request-scoped: built per call, serialized once and
//! dropped. Wire names follow the cash-management web client (camelCase).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Entity type
// ============================================================================

/// Kind of cash-management record a search hit points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Payment,
    Deposit,
    Loan,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Payment, EntityType::Deposit, EntityType::Loan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Deposit => "deposit",
            Self::Loan => "loan",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    /// Case-insensitive; the search functions have emitted both `payment`
    /// and `PAYMENT` over time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payment" | "payments" => Ok(Self::Payment),
            "deposit" | "deposits" => Ok(Self::Deposit),
            "loan" | "loans" => Ok(Self::Loan),
            other => Err(format!("unknown entity type '{other}'")),
        }
    }
}

// ============================================================================
// Search request
// ============================================================================

fn default_true() -> bool {
    true
}

/// Full-text search request (`POST /api/search`).
///
/// `page` and `size` are signed on purpose: negative values must reach the
/// gateway and be rejected as `InvalidPaging` instead of failing JSON
/// decoding with an opaque message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(rename = "query", alias = "text", default)]
    pub text: Option<String>,

    #[serde(default)]
    pub page: i64,

    /// Falls back to the configured default page size when absent.
    #[serde(rename = "size", alias = "pageSize", default)]
    pub page_size: Option<i64>,

    #[serde(default = "default_true")]
    pub include_payments: bool,

    #[serde(default = "default_true")]
    pub include_deposits: bool,

    #[serde(default = "default_true")]
    pub include_loans: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            page: 0,
            page_size: None,
            include_payments: true,
            include_deposits: true,
            include_loans: true,
        }
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn only(mut self, types: &[EntityType]) -> Self {
        self.include_payments = types.contains(&EntityType::Payment);
        self.include_deposits = types.contains(&EntityType::Deposit);
        self.include_loans = types.contains(&EntityType::Loan);
        self
    }

    /// Entity types selected by the include flags, in canonical order.
    pub fn entity_types(&self) -> Vec<EntityType> {
        EntityType::ALL
            .into_iter()
            .filter(|t| match t {
                EntityType::Payment => self.include_payments,
                EntityType::Deposit => self.include_deposits,
                EntityType::Loan => self.include_loans,
            })
            .collect()
    }
}

// ============================================================================
// Results
// ============================================================================

/// A single search hit.
///
/// Full-text hits carry every field. Fuzzy hits carry only the identity
/// fields and `rank`; the rest stay `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub primary_identifier: String,
    #[serde(rename = "date", default)]
    pub occurred_at: Option<NaiveDateTime>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub party_info: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    pub rank: f32,
}

impl SearchResult {
    /// Identity-plus-rank shape returned by fuzzy search.
    pub fn reduced(
        entity_type: EntityType,
        entity_id: i64,
        primary_identifier: impl Into<String>,
        rank: f32,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            primary_identifier: primary_identifier.into(),
            occurred_at: None,
            amount: None,
            currency: None,
            status: None,
            party_info: None,
            description: None,
            reference_number: None,
            rank,
        }
    }

    pub fn is_reduced(&self) -> bool {
        self.occurred_at.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
            && self.status.is_none()
            && self.party_info.is_none()
            && self.description.is_none()
            && self.reference_number.is_none()
    }
}

/// Autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "suggestion")]
    pub text: String,
    /// Where the suggestion came from (e.g. `payment.sender_name`).
    pub source: String,
}

/// Spelling correction candidate with its trigram similarity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingSuggestion {
    #[serde(rename = "suggestion")]
    pub text: String,
    pub similarity: f32,
}

// ============================================================================
// Envelopes
// ============================================================================

/// One page of full-text search results.
///
/// `total_count` is measured by a separate count call and is advisory: the
/// window may hold fewer rows than it implies if data changed in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub items: Vec<SearchResult>,
    pub total_count: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl ResultPage {
    pub fn new(items: Vec<SearchResult>, total_count: u64, page_index: u64, page_size: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size)
        };
        Self {
            items,
            total_count,
            page_index,
            page_size,
            total_pages,
        }
    }

    pub fn empty(page_index: u64, page_size: u64) -> Self {
        Self::new(Vec::new(), 0, page_index, page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages
    }
}

/// Suggestions echoed back together with the text that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEnvelope<T> {
    pub suggestions: Vec<T>,
    pub original_query: String,
}

pub type AutocompleteResponse = SuggestionEnvelope<Suggestion>;
pub type SpellingCorrectionResponse = SuggestionEnvelope<SpellingSuggestion>;
