//! Relative endpoint paths.

pub(crate) const AUTH: &str = "Auth";
pub(crate) const OAUTH_TOKEN: &str = "Auth/Connect/Token";
pub(crate) const SIGN_APP_IN: &str = "Auth/SignAppIn";
pub(crate) const SIGN_OUT: &str = "Auth/Signout";

pub(crate) const MANAGED_ACCOUNTS: &str = "ManagedAccounts";
pub(crate) const MANAGED_SYSTEMS: &str = "ManagedSystems";
pub(crate) const REQUESTS: &str = "Requests";
pub(crate) const CREDENTIALS: &str = "Credentials";
pub(crate) const SECRETS: &str = "Secrets-Safe/Secrets";

pub(crate) fn managed_account(account_id: i64) -> String {
    format!("{MANAGED_ACCOUNTS}/{account_id}")
}

pub(crate) fn managed_system(system_id: i64) -> String {
    format!("{MANAGED_SYSTEMS}/{system_id}")
}

pub(crate) fn system_accounts(system_id: i64) -> String {
    format!("{MANAGED_SYSTEMS}/{system_id}/{MANAGED_ACCOUNTS}")
}

pub(crate) fn credentials(request_id: i64) -> String {
    format!("{CREDENTIALS}/{request_id}")
}

pub(crate) fn checkin(request_id: i64) -> String {
    format!("{REQUESTS}/{request_id}/Checkin")
}

pub(crate) fn credential_test(account_id: i64) -> String {
    format!("{MANAGED_ACCOUNTS}/{account_id}/Credentials/Test")
}

pub(crate) fn credential_change(account_id: i64) -> String {
    format!("{MANAGED_ACCOUNTS}/{account_id}/Credentials/Change")
}

pub(crate) fn secret(secret_id: &str) -> String {
    format!("{SECRETS}/{secret_id}")
}
