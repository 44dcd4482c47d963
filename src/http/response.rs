//! Error responses.
//!
//! # Responsibilities
//! - Map request-path failures to HTTP status codes
//! - Keep the CORS policy on every gateway-generated response
//!
//! # Design Decisions
//! - One attempt per request; no failure here is retried
//! - Bodies are short plain-text reasons, never backend error details

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::headers::apply_cors_policy;

/// Failures a request can hit between accept and the backend response.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No tenant pattern matched the Host header.
    #[error("No matching application")]
    RouteNotFound,

    /// The tenant's wait queue is full.
    #[error("Service unavailable (queue full)")]
    AdmissionRejected,

    /// Connecting to or talking with the backend failed.
    #[error("Bad Gateway")]
    BackendFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The inbound request body exceeded `max_body_size`.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// The inbound request body could not be read.
    #[error("Failed to read request body")]
    BodyRead(#[source] axum::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::AdmissionRejected => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BackendFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), format!("{self}\n")).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        apply_cors_policy(headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::RouteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::AdmissionRejected.status(), StatusCode::SERVICE_UNAVAILABLE);
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(GatewayError::BackendFailure(Box::new(io)).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(GatewayError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let read = axum::Error::new(std::io::Error::other("reset"));
        assert_eq!(GatewayError::BodyRead(read).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_carries_cors() {
        let response = GatewayError::AdmissionRejected.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "ALLOWALL");
    }
}
