//! Pooled HTTP transport for the credential API.
//!
//! One `reqwest::Client` is built per credential client and reused for every
//! call, so connections stay alive across requests.

use crate::error::{CredentialError, CredentialResult};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;

const KEEPALIVE: Duration = Duration::from_secs(60);

/// Transport settings that are independent of authentication.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// TCP connect limit
    pub connect_timeout: Duration,
    /// How long an unused pooled connection is kept
    pub idle_timeout: Duration,
    /// Idle connections kept per appliance host
    pub max_idle_per_host: usize,
    /// Sent as `User-Agent`
    pub user_agent: String,
    /// Skip TLS certificate verification (self-signed appliances)
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 10,
            user_agent: concat!("credential-client/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Set the TCP connect limit.
    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Tune connection pooling.
    #[must_use]
    pub const fn with_pool(mut self, idle_timeout: Duration, max_idle_per_host: usize) -> Self {
        self.idle_timeout = idle_timeout;
        self.max_idle_per_host = max_idle_per_host;
        self
    }

    /// Accept invalid TLS certificates.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Build the pooled client used for all API calls.
///
/// `timeout` bounds each whole request, including reading the body.
///
/// # Errors
///
/// Returns `InvalidConfig` if TLS initialization fails.
pub fn build_http_client(settings: &HttpConfig, timeout: Duration) -> CredentialResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .user_agent(settings.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(settings.connect_timeout)
        .tcp_keepalive(KEEPALIVE)
        .pool_idle_timeout(settings.idle_timeout)
        .pool_max_idle_per_host(settings.max_idle_per_host)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()
        .map_err(|e| CredentialError::invalid_config(format!("HTTP client could not be built: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_defaults() {
        let settings = HttpConfig::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.idle_timeout, Duration::from_secs(90));
        assert_eq!(settings.max_idle_per_host, 10);
        assert!(settings.user_agent.starts_with("credential-client/"));
        assert!(!settings.accept_invalid_certs);
    }

    #[test]
    fn test_transport_overrides() {
        let settings = HttpConfig::default()
            .with_connect_timeout(Duration::from_secs(2))
            .with_user_agent("deploy-bot/1.0")
            .with_pool(Duration::from_secs(5), 2)
            .with_accept_invalid_certs(true);

        assert_eq!(settings.connect_timeout, Duration::from_secs(2));
        assert_eq!(settings.user_agent, "deploy-bot/1.0");
        assert_eq!(settings.idle_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_idle_per_host, 2);
        assert!(settings.accept_invalid_certs);
    }

    #[test]
    fn test_client_builds_with_self_signed_allowed() {
        let settings = HttpConfig::default().with_accept_invalid_certs(true);
        assert!(build_http_client(&settings, Duration::from_secs(30)).is_ok());
    }
}
