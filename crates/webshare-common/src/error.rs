//! Centralized error types for WebShare.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to API responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error type for the HTTP surface. The signaling channel never surfaces errors to
/// clients; it logs and drops instead.
#[derive(Debug, thiserror::Error)]
pub enum WebshareError {
    #[error("Rate limited. Retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("{resource} not found")]
    NotFound { resource: String },
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl WebshareError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::NotFound { .. } => "NOT_FOUND",
        }
    }
}

impl IntoResponse for WebshareError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = self.to_string();

        let retry_after_ms = if let WebshareError::RateLimited { retry_after_ms } = &self {
            Some(*retry_after_ms)
        } else {
            None
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
            retry_after_ms,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(ms) = retry_after_ms {
            let secs = ms.div_ceil(1000).max(1);
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }
        response
    }
}

/// Convenience type alias for Results using WebshareError.
pub type WebshareResult<T> = Result<T, WebshareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_carries_retry_after_header() {
        let response = WebshareError::RateLimited { retry_after_ms: 1500 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = WebshareError::NotFound { resource: "Route".into() };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Route not found");
    }
}
