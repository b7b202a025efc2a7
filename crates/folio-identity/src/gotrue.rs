//! GoTrue Identity Provider
//!
//! Implementation of `IdentityProvider` against a GoTrue-compatible auth
//! service (the kind managed backends front their user pool with). The
//! session token is opaque to us; the service decides what it means.

use async_trait::async_trait;
use serde::Deserialize;

use folio_core::{
    error::{CoreError, Result},
    identity::{IdentityProvider, UserId},
};

/// GoTrue provider configuration
#[derive(Clone, Debug)]
pub struct GoTrueConfig {
    /// Base URL of the auth service (no trailing slash)
    pub base_url: String,

    /// Service api key sent alongside the user's bearer token
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GoTrueConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("AUTH_URL")
            .map_err(|_| CoreError::Identity("AUTH_URL is not set".into()))?;
        let api_key = std::env::var("AUTH_API_KEY")
            .map_err(|_| CoreError::Identity("AUTH_API_KEY is not set".into()))?;

        Ok(Self::new(base_url, api_key))
    }
}

/// Shape of the auth service's user payload; only the id matters here
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
}

/// GoTrue identity provider
pub struct GoTrueProvider {
    client: reqwest::Client,
    config: GoTrueConfig,
}

impl GoTrueProvider {
    /// Create from configuration
    pub fn from_config(config: GoTrueConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Identity(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GoTrueConfig::from_env()?)
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.config.base_url)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn resolve(&self, bearer_token: &str) -> Result<Option<UserId>> {
        let response = self
            .client
            .get(self.user_endpoint())
            .bearer_auth(bearer_token)
            .header("apikey", &self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Identity(format!("auth service unreachable: {e}")))?;

        let status = response.status();

        // An invalid or expired token is an anonymous viewer, not a fault.
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(CoreError::Identity(format!(
                "auth service returned {status}"
            )));
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| CoreError::Identity(format!("malformed user payload: {e}")))?;

        tracing::debug!(user_id = %user.id, "Resolved session token");

        Ok(Some(UserId::from_string(user.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = GoTrueConfig::new("https://auth.example.com/", "key");
        assert_eq!(config.base_url, "https://auth.example.com");
    }

    #[test]
    fn test_user_endpoint() {
        let provider = GoTrueProvider::from_config(GoTrueConfig::new(
            "https://auth.example.com",
            "key",
        ))
        .unwrap();
        assert_eq!(
            provider.user_endpoint(),
            "https://auth.example.com/auth/v1/user"
        );
    }
}
