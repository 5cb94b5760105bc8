//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use talentgraph_core::Error as CoreError;

/// Errors surfaced to HTTP callers
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            Self::Internal(m) => {
                tracing::error!(error = %m, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::InvalidInput(m) => Self::BadRequest(m.clone()),
            CoreError::NotFound(_) => Self::NotFound(err.to_string()),
            _ if err.is_unavailable() => Self::ServiceUnavailable(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let api: ApiError = CoreError::InvalidInput("query cannot be empty".into()).into();
        assert!(matches!(api, ApiError::BadRequest(_)));

        let api: ApiError = CoreError::NotFound("job 9".into()).into();
        assert!(matches!(api, ApiError::NotFound(_)));

        let api: ApiError = CoreError::Llm("provider down".into()).into();
        assert!(matches!(api, ApiError::ServiceUnavailable(_)));

        let api: ApiError = CoreError::Other("boom".into()).into();
        assert!(matches!(api, ApiError::Internal(_)));
    }
}
