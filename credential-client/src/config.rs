//! Credential client configuration.

use crate::error::{CredentialError, CredentialResult};
use crate::transport::HttpConfig;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;
use url::Url;

/// Longest disclosure request the client will ask for.
pub const MAX_REQUEST_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Longest token expiry buffer accepted.
pub const MAX_EXPIRY_BUFFER: Duration = Duration::from_secs(24 * 60 * 60);

/// Authentication scheme selected by a validated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// API key plus run-as identity
    ApiKey,
    /// OAuth client-credentials grant
    OAuth,
}

/// Credential client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://vault.example.com/api/public/v3`
    pub base_url: String,
    /// API key for key-based authentication
    pub api_key: Option<SecretString>,
    /// Run-as username presented with the API key
    pub run_as_username: Option<String>,
    /// Optional run-as password presented with the API key
    pub run_as_password: Option<SecretString>,
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<SecretString>,
    /// Use the OAuth scheme instead of the API key
    pub use_oauth: bool,
    /// Request timeout
    pub timeout: Duration,
    /// Default duration of a password disclosure request
    pub request_duration: Duration,
    /// Treat tokens as expired this long before their real expiry
    pub expiry_buffer: Duration,
    /// Refresh expired tokens transparently
    pub auto_refresh: bool,
    /// Transport tuning
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            run_as_username: None,
            run_as_password: None,
            client_id: None,
            client_secret: None,
            use_oauth: false,
            timeout: Duration::from_secs(30),
            request_duration: Duration::from_secs(60 * 60),
            expiry_buffer: Duration::from_secs(5 * 60),
            auto_refresh: true,
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a numeric or boolean variable is malformed.
    pub fn from_env() -> CredentialResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::new(env::var("CREDENTIAL_BASE_URL").unwrap_or_default());
        config.api_key = non_blank_env("CREDENTIAL_API_KEY").map(SecretString::from);
        config.run_as_username = non_blank_env("CREDENTIAL_RUN_AS_USER");
        config.run_as_password = non_blank_env("CREDENTIAL_RUN_AS_PASSWORD").map(SecretString::from);
        config.client_id = non_blank_env("CREDENTIAL_CLIENT_ID");
        config.client_secret = non_blank_env("CREDENTIAL_CLIENT_SECRET").map(SecretString::from);
        config.use_oauth = parse_env("CREDENTIAL_USE_OAUTH", false)?;
        config.timeout = Duration::from_secs(parse_env("CREDENTIAL_TIMEOUT_SECS", 30)?);
        config.request_duration = minutes_env("CREDENTIAL_REQUEST_DURATION_MINUTES", 60)?;
        config.expiry_buffer = minutes_env("CREDENTIAL_EXPIRY_BUFFER_MINUTES", 5)?;
        config.auto_refresh = parse_env("CREDENTIAL_AUTO_REFRESH", true)?;
        config.http.accept_invalid_certs = parse_env("CREDENTIAL_ACCEPT_INVALID_CERTS", false)?;

        Ok(config)
    }

    /// Configure key-based authentication.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>, run_as_username: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self.run_as_username = Some(run_as_username.into());
        self.use_oauth = false;
        self
    }

    /// Set the run-as password sent alongside the API key.
    #[must_use]
    pub fn with_run_as_password(mut self, password: impl Into<String>) -> Self {
        self.run_as_password = Some(SecretString::from(password.into()));
        self
    }

    /// Configure OAuth client-credentials authentication.
    #[must_use]
    pub fn with_oauth(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::from(client_secret.into()));
        self.use_oauth = true;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default disclosure request duration.
    #[must_use]
    pub const fn with_request_duration(mut self, duration: Duration) -> Self {
        self.request_duration = duration;
        self
    }

    /// Set the token expiry buffer.
    #[must_use]
    pub const fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Enable or disable transparent token refresh.
    #[must_use]
    pub const fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Replace the transport settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Default request duration in whole minutes, never below one.
    #[must_use]
    pub fn request_duration_minutes(&self) -> u32 {
        u32::try_from(self.request_duration.as_secs() / 60)
            .unwrap_or(u32::MAX)
            .max(1)
    }

    /// Validate the configuration and return the selected auth scheme.
    ///
    /// Exactly one scheme must be fully configured.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> CredentialResult<AuthMode> {
        let url = Url::parse(self.normalized_base_url())
            .map_err(|e| CredentialError::invalid_config(format!("base URL is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CredentialError::invalid_config(format!(
                "base URL must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(CredentialError::invalid_config("timeout must be greater than zero"));
        }
        if self.request_duration < Duration::from_secs(60) {
            return Err(CredentialError::invalid_config(
                "request duration must be at least one minute",
            ));
        }
        if self.request_duration > MAX_REQUEST_DURATION {
            return Err(CredentialError::invalid_config(
                "request duration must not exceed 365 days",
            ));
        }
        if self.expiry_buffer > MAX_EXPIRY_BUFFER {
            return Err(CredentialError::invalid_config(
                "expiry buffer must not exceed one day",
            ));
        }

        let has_key = is_set(self.api_key.as_ref().map(|s| s.expose_secret()));
        let has_run_as = is_set(self.run_as_username.as_deref());
        let has_client_id = is_set(self.client_id.as_deref());
        let has_client_secret = is_set(self.client_secret.as_ref().map(|s| s.expose_secret()));

        if self.use_oauth {
            if !has_client_id || !has_client_secret {
                return Err(CredentialError::invalid_config(
                    "OAuth requires both a client id and a client secret",
                ));
            }
            if has_key {
                return Err(CredentialError::invalid_config(
                    "API key must not be set when OAuth is enabled",
                ));
            }
            Ok(AuthMode::OAuth)
        } else {
            if !has_key || !has_run_as {
                return Err(CredentialError::invalid_config(
                    "key-based authentication requires an API key and a run-as username",
                ));
            }
            if has_client_id || has_client_secret {
                return Err(CredentialError::invalid_config(
                    "OAuth client credentials are set but OAuth is not enabled",
                ));
            }
            Ok(AuthMode::ApiKey)
        }
    }
}

fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> CredentialResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| CredentialError::invalid_config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse a whole-minutes environment variable into a duration.
fn minutes_env(name: &str, default: u64) -> CredentialResult<Duration> {
    minutes_to_duration(name, parse_env(name, default)?)
}

fn minutes_to_duration(name: &str, minutes: u64) -> CredentialResult<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| CredentialError::invalid_config(format!("Invalid {name}: {minutes} minutes is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_config() -> ClientConfig {
        ClientConfig::new("https://vault.example.com/api/public/v3/").with_api_key("key-123", "svc-reader")
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.request_duration_minutes(), 60);
        assert_eq!(config.expiry_buffer, Duration::from_secs(300));
        assert!(config.auto_refresh);
        assert!(!config.use_oauth);
    }

    #[test]
    fn test_key_mode_validates() {
        assert_eq!(key_config().validate().ok(), Some(AuthMode::ApiKey));
        let with_pwd = key_config().with_run_as_password("pw");
        assert_eq!(with_pwd.validate().ok(), Some(AuthMode::ApiKey));
    }

    #[test]
    fn test_oauth_mode_validates() {
        let config = ClientConfig::new("https://vault.example.com").with_oauth("client", "secret");
        assert_eq!(config.validate().ok(), Some(AuthMode::OAuth));
    }

    #[test]
    fn test_oauth_flag_without_secret_rejected() {
        let mut config = ClientConfig::new("https://vault.example.com");
        config.use_oauth = true;
        config.client_id = Some("client".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_mixed_schemes_rejected() {
        let config = key_config().with_oauth("client", "secret");
        assert!(config.validate().is_err());

        let mut config = key_config();
        config.client_secret = Some(SecretString::from("secret"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_run_as_rejected() {
        let mut config = key_config();
        config.run_as_username = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let config = ClientConfig::new("not a url").with_api_key("k", "u");
        assert!(config.validate().is_err());

        let config = ClientConfig::new("ftp://vault.example.com").with_api_key("k", "u");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalized_base_url() {
        assert_eq!(
            key_config().normalized_base_url(),
            "https://vault.example.com/api/public/v3"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = key_config().with_run_as_password("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("svc-reader"));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let config = key_config().with_request_duration(Duration::from_secs(1_000_000 * 365 * 86_400));
        assert!(config.validate().unwrap_err().is_invalid_input());

        let config = key_config().with_request_duration(MAX_REQUEST_DURATION);
        assert!(config.validate().is_ok());

        let config = key_config().with_expiry_buffer(MAX_EXPIRY_BUFFER + Duration::from_secs(1));
        assert!(config.validate().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_minutes_overflow_is_invalid_config() {
        let err = minutes_to_duration("CREDENTIAL_REQUEST_DURATION_MINUTES", u64::MAX).unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(
            minutes_to_duration("CREDENTIAL_REQUEST_DURATION_MINUTES", 90).unwrap(),
            Duration::from_secs(5400)
        );

        assert_eq!(
            minutes_env("CREDENTIAL_TEST_UNSET_MINUTES", 5).unwrap(),
            Duration::from_secs(300)
        );
    }
}
