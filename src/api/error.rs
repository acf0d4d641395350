//! HTTP error mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::SearchError;

/// Wraps a [`SearchError`] so handlers can return it with `?`.
#[derive(Debug)]
pub struct AppError(pub SearchError);

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

/// Undecodable bodies and query strings get the same error body as every
/// other client error instead of axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SearchError::InvalidRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(SearchError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "Search request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "Search request rejected");
        }

        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_is_400() {
        let resp = AppError(SearchError::InvalidQuery("empty".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_request_is_400() {
        let resp = AppError(SearchError::InvalidRequest("bad body".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_is_503() {
        let resp = AppError(SearchError::BackendUnavailable("down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn malformed_row_is_500() {
        let resp = AppError(SearchError::malformed("search_all", "short row")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
