//! Request-boundary errors and their JSON responses.

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::revalidate::NotificationError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required secret or key is not configured.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// Missing or wrong credentials; nothing was done.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] NotificationError),

    /// The request body could not be read, e.g. it exceeds the body limit.
    /// Keeps the rejection's own status.
    #[error("request body rejected: {0}")]
    BodyRejected(#[from] BytesRejection),

    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Configuration(detail) => {
                error!(detail = %detail, "configuration_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Configuration error".to_string(),
                        message: None,
                    },
                )
            }
            ApiError::Unauthorized(reason) => {
                warn!(reason = %reason, "request_unauthorized");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse {
                        error: reason.to_string(),
                        message: None,
                    },
                )
            }
            ApiError::MalformedPayload(e) => {
                error!(error = %e, "webhook_payload_malformed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal server error".to_string(),
                        message: Some(e.to_string()),
                    },
                )
            }
            ApiError::BodyRejected(rejection) => {
                let status = rejection.status();
                warn!(status = %status, error = %rejection, "request_body_rejected");
                (
                    status,
                    ErrorResponse {
                        error: status
                            .canonical_reason()
                            .unwrap_or("Bad request")
                            .to_string(),
                        message: Some(rejection.body_text()),
                    },
                )
            }
            ApiError::Internal(message) => {
                error!(error = %message, "internal_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal server error".to_string(),
                        message: Some(message.clone()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Configuration("missing secret").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Unauthorized("Invalid signature").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
