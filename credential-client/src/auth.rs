//! Token lifecycle: key-based and OAuth sign-in, single-flight refresh,
//! and sign-out.
//!
//! Refresh is guarded by an async mutex. Callers first take a read-only fast
//! path; on a miss they queue on the mutex and re-check, so concurrent callers
//! share one network round trip.

use crate::client::CredentialClient;
use crate::config::AuthMode;
use crate::endpoints::{AUTH, OAUTH_TOKEN, SIGN_APP_IN, SIGN_OUT};
use crate::error::{CredentialError, CredentialResult};
use crate::token::{AuthToken, OAuthTokenResponse};
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use std::fmt::Write as _;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Token held by a client plus the refresh guard.
#[derive(Debug, Default)]
pub(crate) struct TokenState {
    current: RwLock<Option<AuthToken>>,
    refresh: Mutex<()>,
}

/// Build a sensitive `Authorization` header for a token.
pub(crate) fn authorization_header(token: &AuthToken) -> CredentialResult<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.authorization()).map_err(|_| {
        CredentialError::auth_failed("authorization value contains characters not allowed in a header")
    })?;
    value.set_sensitive(true);
    Ok(value)
}

async fn body_text(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

impl CredentialClient {
    /// Return a valid token, authenticating first if none is held or the
    /// held one is within the expiry buffer.
    ///
    /// Concurrent callers share a single authentication round trip.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` if the server rejects the credentials, the
    /// OAuth sign-in step fails, or an expired token cannot be refreshed
    /// because auto-refresh is disabled.
    pub async fn ensure_authenticated(&self) -> CredentialResult<AuthToken> {
        if let Some(token) = self.valid_token().await? {
            return Ok(token);
        }

        let _guard = self.tokens.refresh.lock().await;

        if let Some(token) = self.valid_token().await? {
            debug!("Token refreshed by a concurrent caller");
            return Ok(token);
        }

        if let Some(token) = self.adopt_cached_token().await {
            return Ok(token);
        }

        let token = match self.mode {
            AuthMode::ApiKey => self.sign_in_with_key().await?,
            AuthMode::OAuth => self.sign_in_with_oauth().await?,
        };

        *self.tokens.current.write().await = Some(token.clone());
        if let Some(cache) = &self.cache {
            cache.put(&self.base_url, token.clone());
        }
        Ok(token)
    }

    /// Token currently held, valid or not.
    pub async fn current_token(&self) -> Option<AuthToken> {
        self.tokens.current.read().await.clone()
    }

    /// True while a non-expired token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.tokens
            .current
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired(self.config.expiry_buffer))
    }

    /// End the server session and drop the held token.
    ///
    /// Succeeds without a network call when no session was ever opened.
    ///
    /// # Errors
    ///
    /// Returns an API error if the sign-out call fails; the token is kept.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> CredentialResult<()> {
        let _guard = self.tokens.refresh.lock().await;

        let Some(token) = self.tokens.current.read().await.clone() else {
            debug!("Sign-out requested without a session");
            return Ok(());
        };

        let response = self
            .http
            .post(self.url(SIGN_OUT))
            .header(AUTHORIZATION, authorization_header(&token)?)
            .send()
            .await
            .map_err(|e| CredentialError::transport(SIGN_OUT, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = body_text(response).await;
            return Err(CredentialError::api(SIGN_OUT, status, text));
        }

        *self.tokens.current.write().await = None;
        if let Some(cache) = &self.cache {
            cache.invalidate(&self.base_url);
        }
        info!("Signed out");
        Ok(())
    }

    async fn valid_token(&self) -> CredentialResult<Option<AuthToken>> {
        let current = self.tokens.current.read().await;
        match current.as_ref() {
            Some(token) if !token.is_expired(self.config.expiry_buffer) => Ok(Some(token.clone())),
            Some(_) if !self.config.auto_refresh => Err(CredentialError::auth_failed(
                "token expired and automatic refresh is disabled",
            )),
            _ => Ok(None),
        }
    }

    async fn adopt_cached_token(&self) -> Option<AuthToken> {
        let token = self.cache.as_ref()?.get(&self.base_url)?;
        if token.is_expired(self.config.expiry_buffer) {
            return None;
        }
        debug!("Reusing token from shared cache");
        *self.tokens.current.write().await = Some(token.clone());
        Some(token)
    }

    fn key_credential(&self) -> SecretString {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .unwrap_or_default();
        let run_as = self.config.run_as_username.as_deref().unwrap_or_default();
        let mut value = format!("key={api_key}; runas={run_as};");
        if let Some(password) = &self.config.run_as_password {
            let _ = write!(value, " pwd=[{}];", password.expose_secret());
        }
        SecretString::from(value)
    }

    #[instrument(skip(self), fields(run_as = self.config.run_as_username.as_deref().unwrap_or_default()))]
    async fn sign_in_with_key(&self) -> CredentialResult<AuthToken> {
        let token = AuthToken::key_session(self.key_credential(), Utc::now());

        let response = self
            .http
            .get(self.url(AUTH))
            .header(AUTHORIZATION, authorization_header(&token)?)
            .send()
            .await
            .map_err(|e| CredentialError::auth_failed(format!("{AUTH} unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = body_text(response).await;
            warn!(status = status.as_u16(), "API key authentication rejected");
            return Err(CredentialError::auth_rejected(
                status,
                format!("{AUTH} returned {status}: {text}"),
            ));
        }

        info!(expires_in = token.expires_in(), "Authenticated with API key");
        Ok(token)
    }

    #[instrument(skip(self), fields(client_id = self.config.client_id.as_deref().unwrap_or_default()))]
    async fn sign_in_with_oauth(&self) -> CredentialResult<AuthToken> {
        let client_id = self.config.client_id.as_deref().unwrap_or_default();
        let client_secret = self
            .config
            .client_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default();

        let response = self
            .http
            .post(self.url(OAUTH_TOKEN))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::auth_failed(format!("{OAUTH_TOKEN} unreachable: {e}")))?;

        let status = response.status();
        let text = body_text(response).await;
        if !status.is_success() {
            warn!(status = status.as_u16(), "OAuth token request rejected");
            return Err(CredentialError::auth_rejected(
                status,
                format!("{OAUTH_TOKEN} returned {status}: {text}"),
            ));
        }

        let token = serde_json::from_str::<OAuthTokenResponse>(&text)
            .map_err(|e| CredentialError::auth_failed(format!("token response could not be decoded: {e}")))?
            .into_token(Utc::now());

        // The token is unusable until the application is signed into a session.
        let response = self
            .http
            .post(self.url(SIGN_APP_IN))
            .header(AUTHORIZATION, authorization_header(&token)?)
            .send()
            .await
            .map_err(|e| CredentialError::auth_failed(format!("{SIGN_APP_IN} unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = body_text(response).await;
            warn!(status = status.as_u16(), "Application sign-in failed after token grant");
            return Err(CredentialError::auth_rejected(
                status,
                format!("{SIGN_APP_IN} returned {status}: {text}"),
            ));
        }

        info!(expires_in = token.expires_in(), "Authenticated with OAuth client credentials");
        Ok(token)
    }
}
