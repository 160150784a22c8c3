//! Request and response types for the credential API.

use crate::decode::{lenient_datetime, lenient_id, secret_opt};
use crate::error::{CredentialError, CredentialResult};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A vaulted credential identity tied to a managed system.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ManagedAccount {
    /// Canonical account id
    #[serde(rename = "AccountId", default, deserialize_with = "lenient_id")]
    pub account_id: i64,
    /// Legacy account id field, folded into `account_id`
    #[serde(rename = "ManagedAccountID", default, deserialize_with = "lenient_id")]
    pub managed_account_id: i64,
    /// Canonical system id
    #[serde(rename = "SystemId", default, deserialize_with = "lenient_id")]
    pub system_id: i64,
    /// Legacy system id field, folded into `system_id`
    #[serde(rename = "ManagedSystemID", default, deserialize_with = "lenient_id")]
    pub managed_system_id: i64,
    /// Account name
    #[serde(rename = "AccountName", default)]
    pub account_name: String,
    /// Name of the owning system
    #[serde(rename = "SystemName", default)]
    pub system_name: Option<String>,
    /// Domain for domain-linked accounts
    #[serde(rename = "DomainName", default)]
    pub domain_name: Option<String>,
    /// Whether the account is linked from a directory domain
    #[serde(rename = "IsDomainLinked", default)]
    pub is_domain_linked: bool,
    /// Platform id
    #[serde(rename = "PlatformID", default)]
    pub platform_id: Option<i64>,
    /// Default release duration in minutes
    #[serde(rename = "DefaultReleaseDuration", default)]
    pub default_release_duration: Option<u32>,
    /// Maximum release duration in minutes
    #[serde(rename = "MaximumReleaseDuration", default)]
    pub maximum_release_duration: Option<u32>,
    /// Last password change
    #[serde(rename = "LastChangeDate", default, deserialize_with = "lenient_datetime")]
    pub last_change_date: Option<DateTime<Utc>>,
    /// Next scheduled password change
    #[serde(rename = "NextChangeDate", default, deserialize_with = "lenient_datetime")]
    pub next_change_date: Option<DateTime<Utc>>,
}

impl ManagedAccount {
    /// Copy non-zero legacy ids into zero canonical ids.
    pub fn reconcile_ids(&mut self) {
        if self.account_id == 0 && self.managed_account_id != 0 {
            self.account_id = self.managed_account_id;
        }
        if self.system_id == 0 && self.managed_system_id != 0 {
            self.system_id = self.managed_system_id;
        }
    }

    /// Owned variant of [`Self::reconcile_ids`].
    #[must_use]
    pub fn reconciled(mut self) -> Self {
        self.reconcile_ids();
        self
    }
}

/// A target host or platform whose credentials are vaulted.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ManagedSystem {
    /// System id
    #[serde(rename = "ManagedSystemID", default, deserialize_with = "lenient_id")]
    pub system_id: i64,
    /// Asset id
    #[serde(rename = "AssetID", default)]
    pub asset_id: Option<i64>,
    /// Display name
    #[serde(rename = "SystemName", default)]
    pub system_name: String,
    /// Host name
    #[serde(rename = "HostName", default)]
    pub host_name: Option<String>,
    /// DNS name
    #[serde(rename = "DnsName", default)]
    pub dns_name: Option<String>,
    /// IP address
    #[serde(rename = "IPAddress", default)]
    pub ip_address: Option<String>,
    /// NetBIOS name
    #[serde(rename = "NetBiosName", default)]
    pub net_bios_name: Option<String>,
    /// Port
    #[serde(rename = "Port", default)]
    pub port: Option<u16>,
    /// Platform id
    #[serde(rename = "PlatformID", default)]
    pub platform_id: Option<i64>,
}

/// How a disclosed credential will be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AccessType {
    /// Display the password
    #[default]
    View,
    /// Remote desktop session
    #[serde(rename = "RDP")]
    Rdp,
    /// SSH session
    #[serde(rename = "SSH")]
    Ssh,
    /// Application session
    App,
}

/// Request to disclose an account's credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordRequest {
    /// Target system id
    #[serde(rename = "SystemID")]
    pub system_id: i64,
    /// Target account id
    #[serde(rename = "AccountID")]
    pub account_id: i64,
    /// Requested duration in minutes
    #[serde(rename = "DurationMinutes")]
    pub duration_minutes: u32,
    /// Reason recorded in the audit trail
    #[serde(rename = "Reason", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Access type
    #[serde(rename = "AccessType")]
    pub access_type: AccessType,
}

impl PasswordRequest {
    /// Create a `View` request.
    #[must_use]
    pub const fn new(system_id: i64, account_id: i64, duration_minutes: u32) -> Self {
        Self {
            system_id,
            account_id,
            duration_minutes,
            reason: None,
            access_type: AccessType::View,
        }
    }

    /// Set the audit reason; blank reasons are dropped.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);
        self
    }

    /// Set the access type.
    #[must_use]
    pub const fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    /// Check ids and duration before submission.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for non-positive ids or a zero duration.
    pub fn validate(&self) -> CredentialResult<()> {
        require_id("system id", self.system_id)?;
        require_id("account id", self.account_id)?;
        if self.duration_minutes == 0 {
            return Err(CredentialError::invalid_argument(
                "duration must be at least one minute",
            ));
        }
        Ok(())
    }

    fn duration(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}

/// Caller choices for a password retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Audit reason
    pub reason: Option<String>,
    /// Request duration; the configured default when unset
    pub duration: Option<Duration>,
    /// Access type
    pub access_type: AccessType,
}

impl RetrieveOptions {
    /// Set the audit reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the request duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the access type.
    #[must_use]
    pub const fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }
}

/// An open disclosure request.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PasswordRequestResult {
    /// Server-assigned request id
    #[serde(rename = "RequestID", default, deserialize_with = "lenient_id")]
    pub request_id: i64,
    /// Request status
    #[serde(rename = "Status", default)]
    pub status: String,
    /// When the request was created
    #[serde(rename = "CreatedDate", default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the request expires
    #[serde(rename = "ExpirationDate", default, deserialize_with = "lenient_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    /// System id
    #[serde(rename = "SystemID", default, deserialize_with = "lenient_id")]
    pub system_id: i64,
    /// Account id
    #[serde(rename = "AccountID", default, deserialize_with = "lenient_id")]
    pub account_id: i64,
}

impl PasswordRequestResult {
    /// Result for a creation call that only returned the new id.
    #[must_use]
    pub fn created(request_id: i64, request: &PasswordRequest, now: DateTime<Utc>) -> Self {
        Self {
            request_id,
            status: "Pending".to_string(),
            created_at: Some(now),
            expires_at: Some(saturating_add(now, request.duration())),
            system_id: request.system_id,
            account_id: request.account_id,
        }
    }

    /// Fill gaps in a server answer from the submitted request.
    #[must_use]
    pub fn completed_from(mut self, request: &PasswordRequest, now: DateTime<Utc>) -> Self {
        if self.system_id == 0 {
            self.system_id = request.system_id;
        }
        if self.account_id == 0 {
            self.account_id = request.account_id;
        }
        let created = *self.created_at.get_or_insert(now);
        if self.expires_at.is_none() {
            self.expires_at = Some(saturating_add(created, request.duration()));
        }
        self
    }
}

/// Minimal view of an entry in the active request queue.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ActiveRequestRecord {
    #[serde(rename = "RequestID", default, deserialize_with = "lenient_id")]
    request_id: i64,
    #[serde(rename = "AccountID", default, deserialize_with = "lenient_id")]
    account_id: i64,
    #[serde(rename = "ManagedAccountID", default, deserialize_with = "lenient_id")]
    managed_account_id: i64,
    #[serde(rename = "SystemID", default, deserialize_with = "lenient_id")]
    system_id: i64,
    #[serde(rename = "ManagedSystemID", default, deserialize_with = "lenient_id")]
    managed_system_id: i64,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "RequestDate", default, deserialize_with = "lenient_datetime")]
    request_date: Option<DateTime<Utc>>,
    #[serde(rename = "CreatedDate", default, deserialize_with = "lenient_datetime")]
    created_date: Option<DateTime<Utc>>,
    #[serde(rename = "ExpiresDate", default, deserialize_with = "lenient_datetime")]
    expires_date: Option<DateTime<Utc>>,
    #[serde(rename = "ExpirationDate", default, deserialize_with = "lenient_datetime")]
    expiration_date: Option<DateTime<Utc>>,
}

/// Normalized entry in the active request queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRequest {
    /// Request id
    pub request_id: i64,
    /// Account id
    pub account_id: i64,
    /// System id
    pub system_id: i64,
    /// Status, if reported
    pub status: Option<String>,
    /// When the request was made
    pub requested_at: Option<DateTime<Utc>>,
    /// When the request expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl ActiveRequestRecord {
    /// Collapse alternate field names into one shape.
    pub(crate) fn normalize(self) -> ActiveRequest {
        let pick = |primary: i64, alias: i64| if primary == 0 { alias } else { primary };
        ActiveRequest {
            request_id: self.request_id,
            account_id: pick(self.account_id, self.managed_account_id),
            system_id: pick(self.system_id, self.managed_system_id),
            status: self.status,
            requested_at: self.request_date.or(self.created_date),
            expires_at: self.expires_date.or(self.expiration_date),
        }
    }
}

impl ActiveRequest {
    /// Convert into a request result, substituting `now` and
    /// `now + default_duration` for missing dates.
    #[must_use]
    pub fn into_result(self, now: DateTime<Utc>, default_duration: Duration) -> PasswordRequestResult {
        let duration = TimeDelta::from_std(default_duration).unwrap_or(TimeDelta::MAX);
        PasswordRequestResult {
            request_id: self.request_id,
            status: self.status.unwrap_or_else(|| "Active".to_string()),
            created_at: Some(self.requested_at.unwrap_or(now)),
            expires_at: Some(self.expires_at.unwrap_or_else(|| saturating_add(now, duration))),
            system_id: self.system_id,
            account_id: self.account_id,
        }
    }
}

/// Structured body of a credential fetch.
#[derive(Debug, Deserialize)]
pub(crate) struct CredentialPayload {
    #[serde(rename = "Password")]
    pub(crate) password: String,
    #[serde(rename = "UserName", alias = "Username", default)]
    pub(crate) username: Option<String>,
    #[serde(rename = "ExpirationDate", default, deserialize_with = "lenient_datetime")]
    pub(crate) expires_at: Option<DateTime<Utc>>,
}

/// A disclosed credential. Never serialized; the secret is zeroized on drop.
#[derive(Debug, Clone)]
pub struct ManagedPassword {
    /// The secret value
    pub password: SecretString,
    /// Username, when the server includes it
    pub username: Option<String>,
    /// Request that disclosed the secret
    pub request_id: i64,
    /// Account id (zero when fetched by request id alone)
    pub account_id: i64,
    /// System id (zero when fetched by request id alone)
    pub system_id: i64,
    /// When the disclosure expires, if known
    pub expires_at: Option<DateTime<Utc>>,
}

/// Name-based account lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountLookup {
    /// Account name
    pub account_name: String,
    /// System name, required for local accounts
    pub system_name: Option<String>,
    /// Domain name, required for domain-linked accounts
    pub domain_name: Option<String>,
    /// Look the account up as domain-linked
    pub is_domain_linked: bool,
}

impl AccountLookup {
    /// Lookup for an account local to a system.
    #[must_use]
    pub fn local(system_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            system_name: Some(system_name.into()),
            ..Default::default()
        }
    }

    /// Lookup for a domain-linked account.
    #[must_use]
    pub fn domain(domain_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            domain_name: Some(domain_name.into()),
            is_domain_linked: true,
            ..Default::default()
        }
    }

    /// Query parameters for `GET ManagedAccounts`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the account name or the companion
    /// field required by `is_domain_linked` is blank.
    pub fn query(&self) -> CredentialResult<Vec<(&'static str, String)>> {
        let account = require_text("account name", Some(&self.account_name))?;
        if self.is_domain_linked {
            let domain = require_text("domain name", self.domain_name.as_deref())?;
            Ok(vec![
                ("accountName", format!("{domain}\\{account}")),
                ("type", "domainlinked".to_string()),
            ])
        } else {
            let system = require_text("system name", self.system_name.as_deref())?;
            Ok(vec![
                ("systemName", system.to_string()),
                ("accountName", account.to_string()),
            ])
        }
    }
}

/// URL attached to a secret.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SecretUrl {
    /// Url id
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    /// Owning secret id
    #[serde(rename = "CredentialId", default)]
    pub credential_id: Option<String>,
    /// The URL
    #[serde(rename = "Url", default)]
    pub url: String,
}

/// Owner of a secret.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SecretOwner {
    /// Owner id
    #[serde(rename = "OwnerId", default, deserialize_with = "lenient_id")]
    pub owner_id: i64,
    /// Owner name
    #[serde(rename = "Owner", default)]
    pub owner: Option<String>,
    /// Owner e-mail
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
}

/// A vault entry in the secrets safe.
#[derive(Debug, Clone, Deserialize)]
pub struct Secret {
    /// Opaque identifier
    #[serde(rename = "Id")]
    pub id: String,
    /// Title
    #[serde(rename = "Title", default)]
    pub title: String,
    /// Description
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    /// Username payload
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    /// Password payload
    #[serde(rename = "Password", default, deserialize_with = "secret_opt")]
    pub password: Option<SecretString>,
    /// Text payload
    #[serde(rename = "Text", default, deserialize_with = "secret_opt")]
    pub text: Option<SecretString>,
    /// File payload name
    #[serde(rename = "FileName", default)]
    pub file_name: Option<String>,
    /// Secret type, e.g. `Credential`, `Text`, `File`
    #[serde(rename = "SecretType", default)]
    pub secret_type: Option<String>,
    /// Primary owner id
    #[serde(rename = "OwnerId", default, deserialize_with = "lenient_id")]
    pub owner_id: i64,
    /// All owners
    #[serde(rename = "Owners", default)]
    pub owners: Vec<SecretOwner>,
    /// Folder id
    #[serde(rename = "FolderId", default)]
    pub folder_id: Option<String>,
    /// Folder name
    #[serde(rename = "Folder", default)]
    pub folder: Option<String>,
    /// Folder path
    #[serde(rename = "FolderPath", default)]
    pub folder_path: Option<String>,
    /// Associated URLs
    #[serde(rename = "Urls", default)]
    pub urls: Vec<SecretUrl>,
    /// Creation time
    #[serde(rename = "CreatedOn", default, deserialize_with = "lenient_datetime")]
    pub created_on: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(rename = "ModifiedOn", default, deserialize_with = "lenient_datetime")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// Boolean envelope returned by credential tests.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct CredentialTestResult {
    #[serde(rename = "Success", default)]
    pub(crate) success: bool,
}

/// Body of a check-in call.
#[derive(Debug, Serialize)]
pub(crate) struct CheckinBody<'a> {
    #[serde(rename = "Reason")]
    pub(crate) reason: &'a str,
}

/// Body of a queued credential change.
#[derive(Debug, Serialize)]
pub(crate) struct ChangeCredentialBody {
    #[serde(rename = "Queue")]
    pub(crate) queue: bool,
}

/// `start + delta`, clamped to the latest representable instant.
fn saturating_add(start: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    start
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub(crate) fn require_id(what: &str, id: i64) -> CredentialResult<i64> {
    if id > 0 {
        Ok(id)
    } else {
        Err(CredentialError::invalid_argument(format!("{what} must be positive, got {id}")))
    }
}

pub(crate) fn require_text<'a>(what: &str, value: Option<&'a str>) -> CredentialResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CredentialError::invalid_argument(format!("{what} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_alias_ids_reconciled() {
        let account: ManagedAccount =
            serde_json::from_str(r#"{"ManagedAccountID": 42, "ManagedSystemID": 7, "AccountName": "svc"}"#)
                .unwrap();
        let account = account.reconciled();
        assert_eq!(account.account_id, 42);
        assert_eq!(account.system_id, 7);
    }

    #[test]
    fn test_account_primary_ids_win() {
        let account: ManagedAccount = serde_json::from_str(
            r#"{"AccountId": 1, "ManagedAccountID": 42, "SystemId": 2, "ManagedSystemID": null}"#,
        )
        .unwrap();
        let account = account.reconciled();
        assert_eq!(account.account_id, 1);
        assert_eq!(account.system_id, 2);
    }

    #[test]
    fn test_password_request_wire_format() {
        let request = PasswordRequest::new(3, 4, 30).with_reason(Some("  deploy  "));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "SystemID": 3,
                "AccountID": 4,
                "DurationMinutes": 30,
                "Reason": "deploy",
                "AccessType": "View"
            })
        );

        let ssh = PasswordRequest::new(3, 4, 30)
            .with_reason(Some(" "))
            .with_access_type(AccessType::Ssh);
        let json = serde_json::to_value(&ssh).unwrap();
        assert_eq!(json["AccessType"], "SSH");
        assert!(json.get("Reason").is_none());
    }

    #[test]
    fn test_password_request_validation() {
        assert!(PasswordRequest::new(1, 1, 1).validate().is_ok());
        assert!(PasswordRequest::new(0, 1, 1).validate().is_err());
        assert!(PasswordRequest::new(1, -1, 1).validate().is_err());
        assert!(PasswordRequest::new(1, 1, 0).validate().is_err());
    }

    #[test]
    fn test_active_request_substitutes_missing_dates() {
        let record: ActiveRequestRecord =
            serde_json::from_str(r#"{"RequestID": 9, "ManagedAccountID": 5, "RequestDate": "garbage"}"#)
                .unwrap();
        let active = record.normalize();
        assert_eq!(active.account_id, 5);
        assert!(active.requested_at.is_none());

        let now = Utc::now();
        let result = active.into_result(now, Duration::from_secs(600));
        assert_eq!(result.request_id, 9);
        assert_eq!(result.created_at, Some(now));
        assert_eq!(result.expires_at, Some(now + TimeDelta::minutes(10)));
    }

    #[test]
    fn test_active_request_huge_default_duration_saturates() {
        let record: ActiveRequestRecord =
            serde_json::from_str(r#"{"RequestID": 9, "AccountID": 5}"#).unwrap();
        let result = record
            .normalize()
            .into_result(Utc::now(), Duration::from_secs(1_000_000 * 365 * 86_400));
        assert_eq!(result.expires_at, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_created_result_with_longest_request() {
        let now = Utc::now();
        let request = PasswordRequest::new(1, 2, u32::MAX);
        let result = PasswordRequestResult::created(3, &request, now);
        assert!(result.expires_at.unwrap() > now);

        let completed = PasswordRequestResult::default().completed_from(&request, now);
        assert_eq!(completed.expires_at, result.expires_at);
    }

    #[test]
    fn test_active_request_alternate_date_fields() {
        let record: ActiveRequestRecord = serde_json::from_str(
            r#"{"RequestID": 9, "AccountID": 5, "CreatedDate": "2024-01-01T00:00:00Z", "ExpirationDate": "2024-01-01T02:00:00Z"}"#,
        )
        .unwrap();
        let active = record.normalize();
        assert!(active.requested_at.is_some());
        assert!(active.expires_at.is_some());
    }

    #[test]
    fn test_lookup_query_shapes() {
        let domain = AccountLookup::domain("CORP", "svc-app").query().unwrap();
        assert_eq!(
            domain,
            vec![
                ("accountName", "CORP\\svc-app".to_string()),
                ("type", "domainlinked".to_string())
            ]
        );

        let local = AccountLookup::local("db01", "root").query().unwrap();
        assert_eq!(
            local,
            vec![("systemName", "db01".to_string()), ("accountName", "root".to_string())]
        );
    }

    #[test]
    fn test_lookup_requires_companion_field() {
        let mut lookup = AccountLookup::local("db01", "root");
        lookup.is_domain_linked = true;
        assert!(lookup.query().unwrap_err().is_invalid_input());

        let lookup = AccountLookup {
            account_name: "root".to_string(),
            ..Default::default()
        };
        assert!(lookup.query().is_err());
    }

    #[test]
    fn test_secret_debug_redacts_payload() {
        let secret: Secret = serde_json::from_str(
            r#"{"Id": "a1", "Title": "db", "Password": "p@ss", "OwnerId": "3", "Urls": [{"Url": "https://db"}]}"#,
        )
        .unwrap();
        assert_eq!(secret.owner_id, 3);
        assert_eq!(secret.urls.len(), 1);
        assert!(!format!("{secret:?}").contains("p@ss"));
    }
}
