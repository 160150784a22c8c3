//! Shared token cache for client instances pointed at the same server.
//!
//! The cache is advisory: a client still applies its own expiry check to any
//! token it adopts from here.

use crate::token::AuthToken;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Storage for tokens keyed by normalized base URL.
pub trait TokenCache: Send + Sync + Debug {
    /// Look up a token.
    fn get(&self, key: &str) -> Option<AuthToken>;

    /// Store or replace a token.
    fn put(&self, key: &str, token: AuthToken);

    /// Drop a token.
    fn invalidate(&self, key: &str);
}

/// Process-local token cache.
#[derive(Debug, Default)]
pub struct InMemoryTokenCache {
    tokens: RwLock<HashMap<String, AuthToken>>,
}

impl InMemoryTokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenCache for InMemoryTokenCache {
    fn get(&self, key: &str) -> Option<AuthToken> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, token: AuthToken) {
        debug!(key, "Caching token");
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), token);
    }

    fn invalidate(&self, key: &str) {
        debug!(key, "Invalidating cached token");
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;
    use chrono::Utc;
    use secrecy::SecretString;

    fn token(value: &str) -> AuthToken {
        AuthToken::new(SecretString::from(value), TokenType::Bearer, Utc::now(), 3600)
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = InMemoryTokenCache::new();
        assert!(cache.get("https://a").is_none());

        cache.put("https://a", token("one"));
        let cached = cache.get("https://a").unwrap();
        assert_eq!(cached.authorization(), "Bearer one");
        assert_eq!(cache.len(), 1);

        cache.invalidate("https://a");
        assert!(cache.get("https://a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_are_isolated() {
        let cache = InMemoryTokenCache::new();
        cache.put("https://a", token("one"));
        cache.put("https://b", token("two"));
        cache.put("https://a", token("three"));

        assert_eq!(cache.get("https://a").unwrap().authorization(), "Bearer three");
        assert_eq!(cache.get("https://b").unwrap().authorization(), "Bearer two");
    }
}
