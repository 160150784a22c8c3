//! Typed client for a password vaulting and credential checkout REST API.
//!
//! Authenticates with an API key and run-as identity or with OAuth client
//! credentials, resolves managed accounts and systems, checks passwords out
//! and back in, tests and rotates credentials, and reads the secrets safe.
//!
//! ```no_run
//! use credential_client::{AccountLookup, ClientConfig, CredentialClient, RetrieveOptions};
//!
//! # async fn run() -> credential_client::CredentialResult<()> {
//! let config = ClientConfig::new("https://vault.example.com/api/public/v3")
//!     .with_api_key("api-key", "svc-deployer");
//! let client = CredentialClient::new(config)?;
//!
//! let lookup = AccountLookup::local("db01", "app_user");
//! let password = client
//!     .retrieve_password_by_name(&lookup, &RetrieveOptions::default().with_reason("deploy"))
//!     .await?;
//! client.check_in(password.request_id, None).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
pub mod client;
pub mod config;
mod decode;
mod endpoints;
pub mod error;
pub mod models;
pub mod provider;
pub mod token;
pub mod token_cache;
pub mod transport;

pub use client::{CredentialClient, DEFAULT_CHECKIN_REASON};
pub use config::{AuthMode, ClientConfig, MAX_EXPIRY_BUFFER, MAX_REQUEST_DURATION};
pub use error::{CredentialError, CredentialResult};
pub use models::{
    AccessType, AccountLookup, ActiveRequest, ManagedAccount, ManagedPassword, ManagedSystem,
    PasswordRequest, PasswordRequestResult, RetrieveOptions, Secret, SecretOwner, SecretUrl,
};
pub use provider::{CredentialProvider, with_checked_out_password};
pub use token::{AuthToken, TokenType};
pub use token_cache::{InMemoryTokenCache, TokenCache};
pub use transport::HttpConfig;
