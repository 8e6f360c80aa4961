//! HTTP error mapping.
//!
//! Every handler returns `Result<T, ApiError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body with a
//! status code reflecting the failure class:
//!
//! | failure | status |
//! |---|---|
//! | validation | 400 |
//! | body over the size limit | 413 |
//! | missing or wrong `Content-Type` | 415 |
//! | upstream error status / malformed payload | 502 |
//! | upstream timeout, transport failure | 504 |
//! | anything else | 500 |
//!
//! Internal errors are logged in full but only a generic message is returned.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use codecoach_core::error::{Error, ProviderError, ValidationError};

/// Error returned by gateway handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

/// JSON error envelope: `{"error": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Failure class, e.g. `validation_error` or `transport_error`
    #[serde(rename = "type")]
    pub kind: String,

    pub message: String,

    /// Status code the upstream answered with, when it answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(ValidationError::BodyTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Validation(ValidationError::UnsupportedMediaType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Provider(ProviderError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
            Error::Provider(ProviderError::Timeout { .. } | ProviderError::Transport(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Error::Provider(ProviderError::NotConfigured(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(Error::Validation(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        let err = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ValidationError::BodyTooLarge(text),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => ValidationError::UnsupportedMediaType(text),
            // Syntax and schema errors (including unknown roles) stay 400
            _ => ValidationError::MalformedBody(text),
        };
        Self(Error::Validation(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            Error::Validation(e) => e.to_string(),
            Error::Provider(e) if e.class() != "internal_error" => e.to_string(),
            other => {
                error!(error = %other, "internal server error");
                "internal server error".to_owned()
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.0.class().to_owned(),
                message,
                upstream_status: match &self.0 {
                    Error::Provider(e) => e.upstream_status(),
                    _ => None,
                },
            },
        };

        (status, Json(body)).into_response()
    }
}
