//! Identity Provider Abstraction
//!
//! Users are owned by an external identity service; this core only ever
//! sees their opaque ids and the session tokens that resolve to them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque user identifier issued by the external identity provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves opaque session tokens to user ids
///
/// `Ok(None)` means "no authenticated user" and is an ordinary outcome,
/// not an error; errors are reserved for the provider being unreachable.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it belongs to, if any
    async fn resolve(&self, bearer_token: &str) -> Result<Option<UserId>>;
}

/// Fixed token-to-user map (for development and tests)
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, UserId>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user
    pub fn with_token(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, bearer_token: &str) -> Result<Option<UserId>> {
        Ok(self.tokens.get(bearer_token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_resolves_known_token() {
        let provider = StaticIdentityProvider::new()
            .with_token("tok-1", UserId::from_string("u1"));

        let user = provider.resolve("tok-1").await.unwrap();
        assert_eq!(user, Some(UserId::from_string("u1")));

        let missing = provider.resolve("tok-2").await.unwrap();
        assert_eq!(missing, None);
    }
}
