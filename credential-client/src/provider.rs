//! Checkout abstraction over the credential client.

use crate::client::CredentialClient;
use crate::error::CredentialResult;
use crate::models::{AccountLookup, ManagedPassword, RetrieveOptions};
use async_trait::async_trait;

/// Password checkout lifecycle: retrieve, then check in.
///
/// Callers that only need checkout can depend on this trait and swap in a
/// fake for tests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Check out the password of an account by id.
    async fn retrieve_password(
        &self,
        account_id: i64,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword>;

    /// Check out the password of an account by name.
    async fn retrieve_password_by_name(
        &self,
        lookup: &AccountLookup,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword>;

    /// Release a checked-out password.
    async fn check_in(&self, request_id: i64, reason: Option<&str>) -> CredentialResult<()>;
}

#[async_trait]
impl CredentialProvider for CredentialClient {
    async fn retrieve_password(
        &self,
        account_id: i64,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword> {
        Self::retrieve_password(self, account_id, options).await
    }

    async fn retrieve_password_by_name(
        &self,
        lookup: &AccountLookup,
        options: &RetrieveOptions,
    ) -> CredentialResult<ManagedPassword> {
        Self::retrieve_password_by_name(self, lookup, options).await
    }

    async fn check_in(&self, request_id: i64, reason: Option<&str>) -> CredentialResult<()> {
        Self::check_in(self, request_id, reason).await
    }
}

/// Run `f` with a checked-out password and always check it back in.
///
/// The password is checked in even when `f` fails; a check-in failure is
/// reported only when `f` itself succeeded.
///
/// # Errors
///
/// Returns the retrieval error, the error from `f`, or the check-in error.
pub async fn with_checked_out_password<P, F, Fut, T>(
    provider: &P,
    account_id: i64,
    options: &RetrieveOptions,
    f: F,
) -> CredentialResult<T>
where
    P: CredentialProvider + ?Sized,
    F: FnOnce(ManagedPassword) -> Fut + Send,
    Fut: std::future::Future<Output = CredentialResult<T>> + Send,
{
    let password = provider.retrieve_password(account_id, options).await?;
    let request_id = password.request_id;
    let outcome = f(password).await;
    let checkin = provider.check_in(request_id, None).await;
    match (outcome, checkin) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), _) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;
    use secrecy::SecretString;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        checked_in: Mutex<Vec<i64>>,
        fail_checkin: bool,
    }

    #[async_trait]
    impl CredentialProvider for FakeProvider {
        async fn retrieve_password(
            &self,
            account_id: i64,
            _options: &RetrieveOptions,
        ) -> CredentialResult<ManagedPassword> {
            Ok(ManagedPassword {
                password: SecretString::from("pw"),
                username: None,
                request_id: account_id * 10,
                account_id,
                system_id: 1,
                expires_at: None,
            })
        }

        async fn retrieve_password_by_name(
            &self,
            _lookup: &AccountLookup,
            _options: &RetrieveOptions,
        ) -> CredentialResult<ManagedPassword> {
            Err(CredentialError::invalid_argument("not used"))
        }

        async fn check_in(&self, request_id: i64, _reason: Option<&str>) -> CredentialResult<()> {
            self.checked_in.lock().unwrap().push(request_id);
            if self.fail_checkin {
                Err(CredentialError::invalid_argument("check-in refused"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_checks_in_after_success() {
        let provider = FakeProvider::default();
        let value = tokio_test::block_on(with_checked_out_password(
            &provider,
            4,
            &RetrieveOptions::default(),
            |password| async move { Ok(password.request_id) },
        ))
        .unwrap();

        assert_eq!(value, 40);
        assert_eq!(*provider.checked_in.lock().unwrap(), vec![40]);
    }

    #[test]
    fn test_checks_in_after_failure() {
        let provider = FakeProvider::default();
        let err = tokio_test::block_on(with_checked_out_password(
            &provider,
            4,
            &RetrieveOptions::default(),
            |_| async { Err::<(), _>(CredentialError::auth_failed("use failed")) },
        ))
        .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(*provider.checked_in.lock().unwrap(), vec![40]);
    }

    #[test]
    fn test_checkin_error_surfaces_after_success() {
        let provider = FakeProvider {
            fail_checkin: true,
            ..Default::default()
        };
        let err = tokio_test::block_on(with_checked_out_password(
            &provider,
            4,
            &RetrieveOptions::default(),
            |_| async { Ok(()) },
        ))
        .unwrap_err();

        assert!(err.is_invalid_input());
    }
}
