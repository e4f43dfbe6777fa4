//! Caller authentication seam.
//!
//! Token issuance and verification live outside this crate; the orchestrator
//! only needs "bearer credential in, user identity out" and fails closed when
//! the store returns nothing.

use std::collections::HashMap;

use async_trait::async_trait;

/// Resolves a bearer credential to a user identity.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the user identity for a valid credential, `None` otherwise.
    async fn authenticate(&self, token: &str) -> Option<String>;
}

/// Fixed token → user mapping, used by the CLI.
#[derive(Debug, Default)]
pub struct StaticTokenStore {
    tokens: HashMap<String, String>,
}

impl StaticTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user.into());
        self
    }
}

#[async_trait]
impl CredentialStore for StaticTokenStore {
    async fn authenticate(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_resolves_unknown_fails_closed() {
        let store = StaticTokenStore::new().with_token("t0k3n", "alice");
        assert_eq!(store.authenticate("t0k3n").await.as_deref(), Some("alice"));
        assert_eq!(store.authenticate("wrong").await, None);
        assert_eq!(store.authenticate("").await, None);
    }
}
