//! Credential client error types using thiserror 2.0.
//!
//! Errors fall into three families that callers branch on:
//! caller-input errors (raised before any network activity),
//! authentication errors, and API errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the credential client.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Caller supplied an invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Client configuration is incomplete or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A usable token could not be established or maintained
    #[error("Authentication failed: {message}")]
    Authentication {
        /// HTTP status returned by the auth endpoint, if one was received
        status: Option<u16>,
        /// What went wrong
        message: String,
    },

    /// The API answered with an unexpected status
    #[error("Request to {endpoint} failed with status {status}: {body}")]
    Api {
        /// Relative endpoint that was called
        endpoint: String,
        /// Response status
        status: StatusCode,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The response could not be decoded into any accepted shape
    #[error("Unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse {
        /// Relative endpoint that was called
        endpoint: String,
        /// Why decoding failed
        reason: String,
        /// Raw response body
        body: String,
    },

    /// The HTTP transport failed before a response was read
    #[error("Transport error calling {endpoint}: {source}")]
    Transport {
        /// Relative endpoint that was called
        endpoint: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },
}

/// Result type for credential client operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

impl CredentialError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an authentication error without a status code.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::Authentication {
            status: None,
            message: msg.into(),
        }
    }

    /// Create an authentication error for a rejected auth call.
    #[must_use]
    pub fn auth_rejected(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::Authentication {
            status: Some(status.as_u16()),
            message: msg.into(),
        }
    }

    /// Create an API error for an unexpected status.
    #[must_use]
    pub fn api(endpoint: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an error for a body that matched no accepted shape.
    #[must_use]
    pub fn unexpected(
        endpoint: impl Into<String>,
        reason: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::UnexpectedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Wrap a transport failure.
    #[must_use]
    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// True for failures to establish or keep a usable token.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// True for API-side failures (bad status, bad body, transport).
    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::UnexpectedResponse { .. } | Self::Transport { .. }
        )
    }

    /// True for errors raised from caller input before any network call.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::InvalidConfig(_))
    }

    /// HTTP status associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Api { status, .. } => Some(status.as_u16()),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the API answered 409 Conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::CONFLICT)
    }

    /// True when the API answered 404 Not Found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Check if error is retryable by the caller.
    ///
    /// The client never retries on its own; this only classifies.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CredentialError::invalid_argument("account id must be positive");
        assert_eq!(err.to_string(), "Invalid argument: account id must be positive");

        let err = CredentialError::api("Requests", StatusCode::CONFLICT, "open request");
        assert_eq!(
            err.to_string(),
            "Request to Requests failed with status 409 Conflict: open request"
        );
    }

    #[test]
    fn test_error_families_are_disjoint() {
        let auth = CredentialError::auth_rejected(StatusCode::UNAUTHORIZED, "bad key");
        assert!(auth.is_authentication());
        assert!(!auth.is_api());
        assert_eq!(auth.status(), Some(401));

        let api = CredentialError::unexpected("Credentials/1", "empty body", "");
        assert!(api.is_api());
        assert!(!api.is_authentication());

        let input = CredentialError::invalid_config("missing api key");
        assert!(input.is_invalid_input());
        assert!(!input.is_api());
    }

    #[test]
    fn test_conflict_and_not_found() {
        assert!(CredentialError::api("Requests", StatusCode::CONFLICT, "").is_conflict());
        assert!(CredentialError::api("Secrets-Safe/Secrets/x", StatusCode::NOT_FOUND, "").is_not_found());
        assert!(!CredentialError::auth_rejected(StatusCode::CONFLICT, "").is_conflict());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CredentialError::api("Auth", StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(CredentialError::api("Auth", StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(!CredentialError::api("Requests", StatusCode::CONFLICT, "").is_retryable());
        assert!(!CredentialError::auth_failed("expired").is_retryable());
    }
}
