use crate::error::{AnalyticsError, TransportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API error type with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
    Analytics(AnalyticsError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
            Self::Analytics(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Analytics(e) => match e {
                AnalyticsError::InvalidPeriod { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
                AnalyticsError::Transport(TransportError::Quota(_)) => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Reporting API quota exceeded".to_string(),
                ),
                AnalyticsError::Transport(TransportError::Authentication(_)) => (
                    StatusCode::BAD_GATEWAY,
                    "Reporting API rejected the configured credentials".to_string(),
                ),
                AnalyticsError::Transport(_) | AnalyticsError::DataFormat { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "Reporting API request failed".to_string(),
                ),
                AnalyticsError::CacheBackend(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Report cache unavailable".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Report request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        Self::Analytics(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use axum::response::IntoResponse;

    #[test]
    fn test_bad_request_status() {
        let err = ApiError::BadRequest("invalid input".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_status() {
        let err = ApiError::Internal("something broke".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_quota_status() {
        let err = ApiError::from(AnalyticsError::from(TransportError::Quota(
            "daily limit".to_string(),
        )));
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_upstream_failures_are_bad_gateway() {
        for e in [
            AnalyticsError::from(TransportError::Authentication("expired".to_string())),
            AnalyticsError::from(TransportError::Network("reset".to_string())),
            AnalyticsError::data_format("top browsers", "bad row"),
        ] {
            assert_eq!(
                ApiError::from(e).into_response().status(),
                StatusCode::BAD_GATEWAY
            );
        }
    }

    #[test]
    fn test_cache_failure_status() {
        let err = ApiError::from(AnalyticsError::from(CacheError("down".to_string())));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_display() {
        let err = ApiError::BadRequest("test".to_string());
        assert_eq!(format!("{err}"), "Bad request: test");
    }
}
