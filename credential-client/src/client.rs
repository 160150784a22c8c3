//! Credential API client: account and system lookup, password checkout,
//! check-in, credential test/change, and secret lookup.

use crate::auth::{TokenState, authorization_header};
use crate::config::{AuthMode, ClientConfig};
use crate::decode::{self, Shaped};
use crate::endpoints::{self, MANAGED_ACCOUNTS, MANAGED_SYSTEMS, REQUESTS, SECRETS};
use crate::error::{CredentialError, CredentialResult};
use crate::models::{
    AccountLookup, ActiveRequest, ActiveRequestRecord, ChangeCredentialBody, CheckinBody,
    CredentialPayload, CredentialTestResult, ManagedAccount, ManagedPassword, ManagedSystem,
    PasswordRequest, PasswordRequestResult, RetrieveOptions, Secret, require_id, require_text,
};
use crate::token_cache::TokenCache;
use crate::transport::build_http_client;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reason sent with a check-in when the caller gives none.
pub const DEFAULT_CHECKIN_REASON: &str = "Checked in by credential client";

/// Client for the credential API.
///
/// Holds one pooled HTTP transport and one authentication session. Safe to
/// share behind an `Arc`; all methods take `&self`.
pub struct CredentialClient {
    pub(crate) config: ClientConfig,
    pub(crate) mode: AuthMode,
    pub(crate) base_url: String,
    pub(crate) http: Client,
    pub(crate) tokens: TokenState,
    pub(crate) cache: Option<Arc<dyn TokenCache>>,
}

impl fmt::Debug for CredentialClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialClient")
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .field("shared_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialClient {
    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate or the
    /// HTTP transport cannot be built.
    pub fn new(config: ClientConfig) -> CredentialResult<Self> {
        let mode = config.validate()?;
        let http = build_http_client(&config.http, config.timeout)?;
        let base_url = config.normalized_base_url().to_string();
        debug!(base_url = %base_url, ?mode, "Credential client created");

        Ok(Self {
            config,
            mode,
            base_url,
            http,
            tokens: TokenState::default(),
            cache: None,
        })
    }

    /// Create a client from `CREDENTIAL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the environment is incomplete or malformed.
    pub fn from_env() -> CredentialResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Share tokens with other clients pointed at the same base URL.
    #[must_use]
    pub fn with_token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The authentication scheme in use.
    #[must_use]
    pub const fn auth_mode(&self) -> AuthMode {
        self.mode
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> CredentialResult<(StatusCode, String)> {
        let token = self.ensure_authenticated().await?;

        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header(AUTHORIZATION, authorization_header(&token)?);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(b) = body {
            request = request.json(&b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CredentialError::transport(path, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CredentialError::transport(path, e))?;

        debug!(%method, path, status = status.as_u16(), "API call completed");
        Ok((status, text))
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> CredentialResult<String> {
        let (status, text) = self.send(method, path, query, body).await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(CredentialError::api(path, status, text))
        }
    }

    fn to_body<T: Serialize>(value: &T) -> CredentialResult<Value> {
        serde_json::to_value(value)
            .map_err(|e| CredentialError::invalid_argument(format!("request body not serializable: {e}")))
    }

    // ---- Managed accounts and systems ----

    /// List all managed accounts visible to the session.
    ///
    /// # Errors
    ///
    /// Returns an API error on a non-2xx answer or an undecodable body.
    #[instrument(skip(self))]
    pub async fn list_managed_accounts(&self) -> CredentialResult<Vec<ManagedAccount>> {
        let body = self.call(Method::GET, MANAGED_ACCOUNTS, &[], None).await?;
        let accounts = decode::list::<ManagedAccount>(MANAGED_ACCOUNTS, &body)?;
        Ok(accounts.into_iter().map(ManagedAccount::reconciled).collect())
    }

    /// Fetch one managed account by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn get_managed_account(&self, account_id: i64) -> CredentialResult<ManagedAccount> {
        require_id("account id", account_id)?;
        let path = endpoints::managed_account(account_id);
        let body = self.call(Method::GET, &path, &[], None).await?;
        let mut account = decode::object_or_first::<ManagedAccount>(&path, &body)?.reconciled();
        if account.account_id == 0 {
            account.account_id = account_id;
        }
        Ok(account)
    }

    /// Resolve an account by name.
    ///
    /// Domain-linked lookups query `domain\account`; local lookups query by
    /// system and account name. The server may answer with one object or an
    /// array; the first match is returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the required companion field is
    /// missing, or an API error when nothing matches.
    #[instrument(skip(self))]
    pub async fn find_managed_account(&self, lookup: &AccountLookup) -> CredentialResult<ManagedAccount> {
        let query = lookup.query()?;
        let body = self.call(Method::GET, MANAGED_ACCOUNTS, &query, None).await?;
        let account = decode::object_or_first::<ManagedAccount>(MANAGED_ACCOUNTS, &body)?.reconciled();
        debug!(account_id = account.account_id, system_id = account.system_id, "Account resolved");
        Ok(account)
    }

    /// List all managed systems.
    ///
    /// # Errors
    ///
    /// Returns an API error on a non-2xx answer or an undecodable body.
    #[instrument(skip(self))]
    pub async fn list_managed_systems(&self) -> CredentialResult<Vec<ManagedSystem>> {
        let body = self.call(Method::GET, MANAGED_SYSTEMS, &[], None).await?;
        decode::list(MANAGED_SYSTEMS, &body)
    }

    /// Fetch one managed system by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn get_managed_system(&self, system_id: i64) -> CredentialResult<ManagedSystem> {
        require_id("system id", system_id)?;
        let path = endpoints::managed_system(system_id);
        let body = self.call(Method::GET, &path, &[], None).await?;
        decode::object_or_first(&path, &body)
    }

    /// Resolve a managed system by name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank name, or an API error when
    /// nothing matches.
    #[instrument(skip(self))]
    pub async fn find_managed_system(&self, system_name: &str) -> CredentialResult<ManagedSystem> {
        let name = require_text("system name", Some(system_name))?;
        let query = [("name", name.to_string())];
        let body = self.call(Method::GET, MANAGED_SYSTEMS, &query, None).await?;
        decode::object_or_first(MANAGED_SYSTEMS, &body)
    }

    /// List the accounts managed on a system.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn list_system_accounts(&self, system_id: i64) -> CredentialResult<Vec<ManagedAccount>> {
        require_id("system id", system_id)?;
        let path = endpoints::system_accounts(system_id);
        let body = self.call(Method::GET, &path, &[], None).await?;
        let accounts = decode::list::<ManagedAccount>(&path, &body)?;
        Ok(accounts
            .into_iter()
            .map(|account| {
                let mut account = account.reconciled();
                if account.system_id == 0 {
                    account.system_id = system_id;
                }
                account
            })
            .collect())
    }

    // ---- Disclosure requests ----

    /// Submit a disclosure request.
    ///
    /// A `409 Conflict` is returned as an API error; see
    /// [`Self::request_or_reuse`] for the conflict-tolerant variant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed request, otherwise API
    /// errors.
    #[instrument(skip(self))]
    pub async fn create_password_request(
        &self,
        request: &PasswordRequest,
    ) -> CredentialResult<PasswordRequestResult> {
        request.validate()?;
        let body = self
            .call(Method::POST, REQUESTS, &[], Some(Self::to_body(request)?))
            .await?;

        let now = Utc::now();
        let result = match decode::object_or_raw::<PasswordRequestResult>(REQUESTS, &body)? {
            Shaped::Object(result) => result.completed_from(request, now),
            Shaped::Raw(raw) => {
                let request_id = raw.trim().parse::<i64>().map_err(|_| {
                    CredentialError::unexpected(REQUESTS, "request id is not numeric", body.as_str())
                })?;
                PasswordRequestResult::created(request_id, request, now)
            }
        };

        if result.request_id <= 0 {
            return Err(CredentialError::unexpected(REQUESTS, "no request id returned", body));
        }
        debug!(request_id = result.request_id, "Password request created");
        Ok(result)
    }

    /// Submit a disclosure request, reusing the caller's open request for the
    /// same account when the server reports a conflict.
    ///
    /// # Errors
    ///
    /// Returns the original conflict error when no matching open request is
    /// found, and API errors otherwise.
    #[instrument(skip(self))]
    pub async fn request_or_reuse(&self, request: &PasswordRequest) -> CredentialResult<PasswordRequestResult> {
        match self.create_password_request(request).await {
            Err(conflict) if conflict.is_conflict() => {
                warn!(account_id = request.account_id, "Request already open, looking for it");
                match self.find_active_request(request.account_id).await {
                    Ok(Some(active)) => {
                        info!(request_id = active.request_id, "Reusing open password request");
                        Ok(active.into_result(Utc::now(), self.config.request_duration))
                    }
                    Ok(None) => Err(conflict),
                    Err(lookup) => {
                        warn!(error = %lookup, "Active request lookup failed");
                        Err(conflict)
                    }
                }
            }
            other => other,
        }
    }

    /// List the session's active requests.
    ///
    /// Records that cannot be decoded are skipped.
    ///
    /// # Errors
    ///
    /// Returns an API error on a non-2xx answer or a non-array body.
    #[instrument(skip(self))]
    pub async fn list_active_requests(&self) -> CredentialResult<Vec<ActiveRequest>> {
        let query = [("status", "active".to_string()), ("queue", "req".to_string())];
        let body = self.call(Method::GET, REQUESTS, &query, None).await?;
        let records = decode::lenient_list::<ActiveRequestRecord>(REQUESTS, &body)?;
        Ok(records.into_iter().map(ActiveRequestRecord::normalize).collect())
    }

    /// First active request for an account.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::list_active_requests`].
    pub async fn find_active_request(&self, account_id: i64) -> CredentialResult<Option<ActiveRequest>> {
        Ok(self
            .list_active_requests()
            .await?
            .into_iter()
            .find(|active| active.account_id == account_id && active.request_id > 0))
    }

    // ---- Password retrieval ----

    /// Check out the password of an account identified by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise
    /// authentication or API errors from any step.
    #[instrument(skip(self))]
    pub async fn retrieve_password(
        &self,
        account_id: i64,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword> {
        let account = self.get_managed_account(account_id).await?;
        self.retrieve_for_account(&account, options).await
    }

    /// Check out the password of an account identified by name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an incomplete lookup, otherwise
    /// authentication or API errors from any step.
    #[instrument(skip(self))]
    pub async fn retrieve_password_by_name(
        &self,
        lookup: &AccountLookup,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword> {
        let account = self.find_managed_account(lookup).await?;
        self.retrieve_for_account(&account, options).await
    }

    /// Fetch the credential disclosed by an existing request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn get_password_by_request_id(&self, request_id: i64) -> CredentialResult<ManagedPassword> {
        require_id("request id", request_id)?;
        self.fetch_credential(request_id).await
    }

    async fn retrieve_for_account(
        &self,
        account: &ManagedAccount,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword> {
        if account.account_id <= 0 || account.system_id <= 0 {
            return Err(CredentialError::unexpected(
                MANAGED_ACCOUNTS,
                "account is missing its account or system id",
                format!("{account:?}"),
            ));
        }

        let minutes = options.duration.map_or_else(
            || self.config.request_duration_minutes(),
            |d| u32::try_from(d.as_secs() / 60).unwrap_or(u32::MAX),
        );
        let request = PasswordRequest::new(account.system_id, account.account_id, minutes)
            .with_reason(options.reason.as_deref())
            .with_access_type(options.access_type);

        let result = self.request_or_reuse(&request).await?;
        let mut password = self.fetch_credential(result.request_id).await?;
        password.account_id = result.account_id;
        password.system_id = result.system_id;
        password.expires_at = password.expires_at.or(result.expires_at);
        Ok(password)
    }

    async fn fetch_credential(&self, request_id: i64) -> CredentialResult<ManagedPassword> {
        let path = endpoints::credentials(request_id);
        let body = self.call(Method::GET, &path, &[], None).await?;

        let (password, username, expires_at) = match decode::object_or_raw::<CredentialPayload>(&path, &body)? {
            Shaped::Object(payload) => (payload.password, payload.username, payload.expires_at),
            Shaped::Raw(raw) => (raw, None, None),
        };

        debug!(request_id, "Credential retrieved");
        Ok(ManagedPassword {
            password: SecretString::from(password),
            username,
            request_id,
            account_id: 0,
            system_id: 0,
            expires_at,
        })
    }

    // ---- Check-in and credential maintenance ----

    /// Release a disclosure request before it expires.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, or an API error
    /// carrying the response body on any non-2xx answer.
    #[instrument(skip(self))]
    pub async fn check_in(&self, request_id: i64, reason: Option<&str>) -> CredentialResult<()> {
        require_id("request id", request_id)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CHECKIN_REASON);
        let path = endpoints::checkin(request_id);

        let (status, text) = self
            .send(Method::PUT, &path, &[], Some(Self::to_body(&CheckinBody { reason })?))
            .await?;
        if status == StatusCode::NO_CONTENT || status.is_success() {
            info!(request_id, "Password request checked in");
            Ok(())
        } else {
            Err(CredentialError::api(path, status, text))
        }
    }

    /// Ask the server to verify an account's current credential.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn test_credential(&self, account_id: i64) -> CredentialResult<bool> {
        require_id("account id", account_id)?;
        let path = endpoints::credential_test(account_id);
        let body = self.call(Method::POST, &path, &[], None).await?;
        let result = decode::object_or_first::<CredentialTestResult>(&path, &body)?;
        debug!(account_id, success = result.success, "Credential tested");
        Ok(result.success)
    }

    /// Rotate an account's credential, immediately or via the change queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive id, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn change_credential(&self, account_id: i64, queue: bool) -> CredentialResult<()> {
        require_id("account id", account_id)?;
        let path = endpoints::credential_change(account_id);
        let body = if queue {
            Some(Self::to_body(&ChangeCredentialBody { queue: true })?)
        } else {
            None
        };
        self.call(Method::POST, &path, &[], body).await?;
        info!(account_id, queue, "Credential change requested");
        Ok(())
    }

    // ---- Secrets safe ----

    /// Fetch a secret by id; a 404 is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank or malformed id, otherwise API
    /// errors for any non-2xx answer other than 404.
    #[instrument(skip(self))]
    pub async fn get_secret_by_id(&self, secret_id: &str) -> CredentialResult<Option<Secret>> {
        let secret_id = require_text("secret id", Some(secret_id))?;
        if !secret_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CredentialError::invalid_argument(format!(
                "secret id contains unsupported characters: {secret_id}"
            )));
        }
        let path = endpoints::secret(secret_id);

        let (status, text) = self.send(Method::GET, &path, &[], None).await?;
        if status == StatusCode::NOT_FOUND {
            debug!(secret_id, "Secret not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CredentialError::api(path, status, text));
        }
        decode::object_or_first(&path, &text).map(Some)
    }

    /// Fetch the first secret with the given title.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank title, otherwise API errors.
    #[instrument(skip(self))]
    pub async fn get_secret_by_title(&self, title: &str) -> CredentialResult<Option<Secret>> {
        let title = require_text("title", Some(title))?;
        let query = [("Title", title.to_string())];
        let body = self.call(Method::GET, SECRETS, &query, None).await?;
        decode::first_or_none(SECRETS, &body)
    }
}
