//! Server Configuration
//!
//! All secrets are collected once at startup. A missing secret aborts the
//! process: the purchase endpoints must never come up unable to verify
//! signatures or open checkout sessions.

use folio_payments::{PaymentError, Result};

/// Server configuration loaded from the environment
#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address
    pub bind_addr: String,

    /// Public site base URL, for checkout redirect construction
    pub site_url: String,

    /// Currency articles are priced in (lowercase ISO code)
    pub currency: String,

    /// Payment provider secret key
    pub stripe_secret_key: String,

    /// Webhook signing secret
    pub webhook_secret: String,

    /// Identity service base URL
    pub auth_url: String,

    /// Identity service api key
    pub auth_api_key: String,

    /// Optional JSON file of articles to seed at startup
    pub articles_seed: Option<String>,
}

impl Config {
    /// Load from environment variables, failing on any missing secret
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            site_url: required("SITE_URL")?,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "jpy".into()),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            auth_url: required("AUTH_URL")?,
            auth_api_key: required("AUTH_API_KEY")?,
            articles_seed: std::env::var("ARTICLES_SEED").ok(),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| PaymentError::Config(format!("{name} is not set")))
}
