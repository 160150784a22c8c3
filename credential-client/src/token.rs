//! Authentication token record and expiry rules.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Lifetime assumed for key-based sessions; the server does not report one.
pub const KEY_SESSION_LIFETIME_SECS: u64 = 3600;

/// Authorization scheme of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Composite API key + run-as identity
    PsAuth,
    /// OAuth bearer token
    Bearer,
}

impl TokenType {
    /// Scheme name used in the `Authorization` header.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::PsAuth => "PS-Auth",
            Self::Bearer => "Bearer",
        }
    }

    fn from_wire(value: &str) -> Self {
        if value.eq_ignore_ascii_case("PS-Auth") {
            Self::PsAuth
        } else {
            Self::Bearer
        }
    }
}

/// A token usable to authorize API calls.
#[derive(Debug, Clone)]
pub struct AuthToken {
    access_token: SecretString,
    token_type: TokenType,
    issued_at: DateTime<Utc>,
    expires_in: u64,
}

impl AuthToken {
    /// Create a token record.
    #[must_use]
    pub const fn new(
        access_token: SecretString,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token,
            token_type,
            issued_at,
            expires_in,
        }
    }

    /// Synthesize the record for a verified key-based session.
    #[must_use]
    pub const fn key_session(value: SecretString, issued_at: DateTime<Utc>) -> Self {
        Self::new(value, TokenType::PsAuth, issued_at, KEY_SESSION_LIFETIME_SECS)
    }

    /// Token scheme.
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// When the token was obtained.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Lifetime in seconds from `issued_at`.
    #[must_use]
    pub const fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// Absolute expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = i64::try_from(self.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        self.issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True when `now + buffer` has reached the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        let buffer = TimeDelta::from_std(buffer).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(buffer)
            .is_none_or(|deadline| deadline >= self.expires_at())
    }

    /// Expiry check against the current clock.
    #[must_use]
    pub fn is_expired(&self, buffer: Duration) -> bool {
        self.is_expired_at(Utc::now(), buffer)
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type.scheme(), self.access_token.expose_secret())
    }

    /// True when both records carry the same credential and issue time.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        self.token_type == other.token_type
            && self.issued_at == other.issued_at
            && self.access_token.expose_secret() == other.access_token.expose_secret()
    }
}

/// OAuth token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthTokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_token_type() -> String {
    TokenType::Bearer.scheme().to_string()
}

const fn default_expires_in() -> u64 {
    KEY_SESSION_LIFETIME_SECS
}

impl OAuthTokenResponse {
    /// Stamp the response into a token record.
    pub(crate) fn into_token(self, issued_at: DateTime<Utc>) -> AuthToken {
        AuthToken::new(
            SecretString::from(self.access_token),
            TokenType::from_wire(&self.token_type),
            issued_at,
            self.expires_in,
        )
    }
}
