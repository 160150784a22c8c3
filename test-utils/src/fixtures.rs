//! JSON response fixtures shaped like the credential API's answers.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

/// Sample API key.
pub const API_KEY: &str = "c479a66f6d8ea1c1b1e8d3a9f0c6b5d4e3f2a1b0c9d8e7f6a5b4c3d2e1f0a9b8";
/// Sample run-as user.
pub const RUN_AS: &str = "svc-deployer";
/// Sample OAuth client id.
pub const CLIENT_ID: &str = "9f3c2a1e-7b44-4d0b-9d7a-1c2e3f4a5b6c";
/// Sample OAuth client secret.
pub const CLIENT_SECRET: &str = "s3cr3t-client-value";

/// `Authorization` header sent for key-based auth without a password.
#[must_use]
pub fn ps_auth_header(api_key: &str, run_as: &str) -> String {
    format!("PS-Auth key={api_key}; runas={run_as};")
}

/// Managed account using canonical id fields.
#[must_use]
pub fn managed_account(account_id: i64, system_id: i64, account_name: &str) -> Value {
    json!({
        "AccountId": account_id,
        "SystemId": system_id,
        "AccountName": account_name,
        "SystemName": "db01",
        "DomainName": null,
        "PlatformID": 4,
        "DefaultReleaseDuration": 120,
        "MaximumReleaseDuration": 525_600,
        "LastChangeDate": "2024-05-01T09:30:00",
        "NextChangeDate": null
    })
}

/// Managed account using only the legacy id fields.
#[must_use]
pub fn legacy_managed_account(account_id: i64, system_id: i64, account_name: &str) -> Value {
    json!({
        "ManagedAccountID": account_id,
        "ManagedSystemID": system_id,
        "AccountName": account_name,
        "SystemName": "db01"
    })
}

/// Managed system.
#[must_use]
pub fn managed_system(system_id: i64, system_name: &str) -> Value {
    json!({
        "ManagedSystemID": system_id,
        "AssetID": system_id + 1000,
        "SystemName": system_name,
        "HostName": system_name,
        "DnsName": format!("{system_name}.corp.example.com"),
        "IPAddress": "10.0.4.17",
        "Port": 5432,
        "PlatformID": 4
    })
}

/// Structured answer to a request creation.
#[must_use]
pub fn password_request_result(request_id: i64, system_id: i64, account_id: i64) -> Value {
    json!({
        "RequestID": request_id,
        "SystemID": system_id,
        "AccountID": account_id,
        "Status": "Approved",
        "CreatedDate": "2024-06-01T12:00:00Z",
        "ExpirationDate": "2024-06-01T13:00:00Z"
    })
}

/// Entry of the active request queue.
#[must_use]
pub fn active_request(request_id: i64, account_id: i64, expires: Option<DateTime<Utc>>) -> Value {
    let mut entry = json!({
        "RequestID": request_id,
        "ManagedAccountID": account_id,
        "SystemID": 1,
        "Status": "Approved",
        "RequestDate": "2024-06-01T12:00:00"
    });
    if let Some(expires) = expires {
        entry["ExpiresDate"] = Value::String(expires.to_rfc3339());
    }
    entry
}

/// Structured credential body.
#[must_use]
pub fn credential(password: &str) -> Value {
    json!({ "Password": password, "UserName": "app_user" })
}

/// Secrets-safe entry.
#[must_use]
pub fn secret(secret_id: &str, title: &str, password: &str) -> Value {
    json!({
        "Id": secret_id,
        "Title": title,
        "Description": "Reporting database login",
        "Username": "report_reader",
        "Password": password,
        "SecretType": "Credential",
        "OwnerId": 2,
        "Owners": [{ "OwnerId": 2, "Owner": "CORP\\ops", "Email": "ops@example.com" }],
        "FolderId": "0f4a5b4e-0a3b-4c9e-8b7d-2d5c6e7f8a9b",
        "Folder": "Databases",
        "FolderPath": "Ops/Databases",
        "Urls": [{ "Id": "7a1b", "CredentialId": secret_id, "Url": "https://reports.example.com" }],
        "CreatedOn": "2024-01-15T08:00:00Z",
        "ModifiedOn": "2024-02-20T16:45:00Z"
    })
}

/// OAuth token endpoint answer.
#[must_use]
pub fn oauth_token(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}
