//! Shared proptest generators for credential-client tests.

use proptest::prelude::*;

/// Generate API keys (hex, like the appliance issues).
pub fn api_key_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{64}"
}

/// Generate run-as usernames, optionally domain-qualified.
pub fn run_as_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{3,15}",
        ("[A-Z]{2,8}", "[a-z][a-z0-9_]{3,15}").prop_map(|(domain, user)| format!("{domain}\\{user}")),
    ]
}

/// Generate positive entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = i64> {
    1i64..10_000_000
}

/// Generate account names.
pub fn account_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{2,20}"
}

/// Generate system names.
pub fn system_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,15}(\\.[a-z]{2,8}){0,2}"
}

/// Generate token lifetimes in seconds (1 minute to 1 day).
pub fn expires_in_strategy() -> impl Strategy<Value = u64> {
    60u64..86_400
}

/// Generate expiry buffers in seconds, including zero and buffers longer
/// than typical lifetimes.
pub fn expiry_buffer_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1u64..600, 86_400u64..200_000]
}

/// Generate HTTP status codes outside the 2xx range.
pub fn failure_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(401u16),
        Just(403u16),
        Just(404u16),
        Just(409u16),
        Just(429u16),
        Just(500u16),
        Just(502u16),
        Just(503u16),
    ]
}
