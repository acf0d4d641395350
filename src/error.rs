//! Error taxonomy for the search gateway.
//!
//! Validation errors are raised before the backend is touched and map to
//! 400-class responses. Row-shape drift and backend failures map to 5xx.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid paging: {0}")]
    InvalidPaging(String),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("malformed row from {function}: {reason}")]
    MalformedRow {
        function: &'static str,
        reason: String,
    },

    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("search backend error: {0}")]
    BackendError(String),
}

impl SearchError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidQuery(_)
            | Self::InvalidPaging(_)
            | Self::InvalidPrefix(_)
            | Self::InvalidThreshold(_) => 400,
            Self::MalformedRow { .. } | Self::BackendError(_) => 500,
            Self::BackendUnavailable(_) => 503,
        }
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidQuery(_) => "invalid_query",
            Self::InvalidPaging(_) => "invalid_paging",
            Self::InvalidPrefix(_) => "invalid_prefix",
            Self::InvalidThreshold(_) => "invalid_threshold",
            Self::MalformedRow { .. } => "malformed_row",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::BackendError(_) => "backend_error",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.http_status() == 400
    }

    pub(crate) fn malformed(function: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            function,
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Self::BackendUnavailable(err.to_string()),
            other => Self::BackendError(other.to_string()),
        }
    }
}
