//! Error types for the Code Coach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them.

use thiserror::Error;

/// The top-level error type for all Code Coach operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Model gateway ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    /// Machine-readable name of the failure class, as reported to HTTP callers.
    pub fn class(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Provider(e) => e.class(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A malformed or incomplete chat request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("messages must not be empty")]
    EmptyMessages,

    #[error("messages must contain at least one user message")]
    NoUserMessage,

    #[error("message at index {index} has empty content")]
    EmptyContent { index: usize },

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request body too large: {0}")]
    BodyTooLarge(String),

    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),
}

/// Failures of the single upstream chat-completion call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The upstream answered, but with an error status or an unusable payload.
    #[error("Upstream API error: {message}")]
    Upstream {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Upstream request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The upstream could not be reached at all (DNS, refused connection, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    pub fn class(&self) -> &'static str {
        match self {
            ProviderError::Upstream { .. } | ProviderError::Timeout { .. } => "upstream_error",
            ProviderError::Transport(_) => "transport_error",
            ProviderError::NotConfigured(_) => "internal_error",
        }
    }

    /// HTTP status reported by the upstream, if it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_displays_message() {
        let err = Error::Provider(ProviderError::Upstream {
            status_code: Some(429),
            message: "Rate limit reached".into(),
        });
        assert!(err.to_string().contains("Rate limit reached"));
        assert_eq!(err.class(), "upstream_error");
    }

    #[test]
    fn failure_classes() {
        assert_eq!(
            Error::from(ValidationError::EmptyMessages).class(),
            "validation_error"
        );
        assert_eq!(
            Error::from(ProviderError::Transport("connection refused".into())).class(),
            "transport_error"
        );
        assert_eq!(
            Error::from(ProviderError::Timeout { timeout_secs: 60 }).class(),
            "upstream_error"
        );
        assert_eq!(
            Error::from(ProviderError::NotConfigured("no key".into())).class(),
            "internal_error"
        );
    }

    #[test]
    fn upstream_status_only_for_upstream_answers() {
        let err = ProviderError::Upstream {
            status_code: Some(500),
            message: "server error".into(),
        };
        assert_eq!(err.upstream_status(), Some(500));
        assert_eq!(ProviderError::Transport("dns".into()).upstream_status(), None);
    }
}
