//! Gateway error taxonomy and its HTTP mapping.

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::upstream::{TransportError, Upstream};

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No `Authorization` header; rejected before any upstream call.
    #[error("Authorization header required")]
    MissingCredential,

    /// Inbound body is not a JSON object; rejected before any upstream call.
    #[error("Invalid JSON: {0}")]
    MalformedBody(String),

    /// A mandatory upstream could not be reached.
    #[error("{upstream} unavailable: {source}")]
    Unavailable {
        upstream: Upstream,
        #[source]
        source: TransportError,
    },

    /// A mandatory upstream answered with a non-success status; relayed as-is.
    #[error("{upstream} returned status {status}")]
    UpstreamRejected {
        upstream: Upstream,
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    /// A success body from an upstream was not the JSON it promises.
    #[error("{upstream} returned an unreadable body: {source}")]
    InvalidUpstreamPayload {
        upstream: Upstream,
        #[source]
        source: serde_json::Error,
    },

    /// Building an outbound body failed.
    #[error("Failed to encode {upstream} request: {source}")]
    Encode {
        upstream: Upstream,
        #[source]
        source: serde_json::Error,
    },

    /// One or more dispatched updates failed. Applied changes are not rolled back.
    #[error("Partial update failed: {}", .0.join("; "))]
    PartialUpdate(Vec<String>),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredential => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamRejected { status, .. } => *status,
            GatewayError::InvalidUpstreamPayload { .. }
            | GatewayError::Encode { .. }
            | GatewayError::PartialUpdate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::MalformedBody(_) => "Invalid JSON".to_string(),
            GatewayError::Unavailable { .. } => "Service unavailable".to_string(),
            GatewayError::InvalidUpstreamPayload { .. } | GatewayError::Encode { .. } => {
                "Error processing response".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// JSON error body used by every gateway-generated failure.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::UpstreamRejected {
                status,
                content_type,
                body,
                ..
            } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                if let Some(content_type) = content_type {
                    response.headers_mut().insert(CONTENT_TYPE, content_type);
                }
                response
            }
            other => {
                match other.status() {
                    StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                        tracing::error!(error = %other, "Request failed");
                    }
                    _ => tracing::debug!(error = %other, "Request rejected"),
                }
                error_response(other.status(), other.public_message())
            }
        }
    }
}
