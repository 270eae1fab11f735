//! Error types for Turnstile
//!
//! Every failure a request handler can see maps onto one of these variants,
//! and each variant has a fixed HTTP status. Credential-source and signing
//! errors are caught at the request boundary and translated here; nothing
//! propagates unhandled to hyper.

use hyper::StatusCode;
use thiserror::Error;

/// Gateway-wide error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or empty request input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials did not match or token was rejected (401)
    ///
    /// The message is intentionally uniform ("Invalid username or password")
    /// so a caller cannot tell which field was wrong.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A remote credential source could not be reached or returned garbage (500)
    ///
    /// Distinct from `Auth`: a SheetDB outage must not look like a bad
    /// password to the client.
    #[error("Credential source unavailable: {0}")]
    SourceUnavailable(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP-level problem (unreadable body, oversized payload)
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O error (listener bind, connection handling)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (token signing, serialization)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status this error translates to at the request boundary
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::SourceUnavailable(_)
            | GatewayError::Config(_)
            | GatewayError::Http(_)
            | GatewayError::Io(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    ///
    /// 5xx causes are logged server-side and never echoed verbatim.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Validation(msg) => msg.clone(),
            GatewayError::Auth(msg) => msg.clone(),
            _ => "Server error occurred".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Auth("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::SourceUnavailable("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_causes_not_echoed() {
        let err = GatewayError::SourceUnavailable("sheetdb timed out at 10.0.0.5".into());
        assert_eq!(err.client_message(), "Server error occurred");

        let err = GatewayError::Auth("Invalid username or password".into());
        assert_eq!(err.client_message(), "Invalid username or password");
    }
}
