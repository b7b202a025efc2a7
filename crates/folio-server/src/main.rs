//! folio HTTP Server
//!
//! Axum-based server for the folio publishing platform: gated article
//! reads, checkout initiation and the payment provider webhook.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::{
    Article, ArticleStore, IdentityProvider, MemoryArticleStore, MemoryEntitlementStore,
};
use folio_identity::{GoTrueConfig, GoTrueProvider};
use folio_payments::{CheckoutInitiator, StripeGateway, WebhookHandler};

use crate::config::Config;
use crate::handlers::{create_purchase, get_article, health_check, payment_webhook};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Secrets are load-bearing for both purchase endpoints; refuse to
    // start without them rather than degrading per request.
    let config = Config::from_env()?;

    // Stores
    let articles = Arc::new(MemoryArticleStore::new());
    let entitlements = Arc::new(MemoryEntitlementStore::new());

    if let Some(path) = &config.articles_seed {
        let count = seed_articles(articles.as_ref(), path).await?;
        tracing::info!("✓ Seeded {} articles from {}", count, path);
    }

    // External collaborators
    let identity: Arc<dyn IdentityProvider> = Arc::new(GoTrueProvider::from_config(
        GoTrueConfig::new(config.auth_url.clone(), config.auth_api_key.clone()),
    )?);
    let gateway = Arc::new(StripeGateway::new(&config.stripe_secret_key));
    tracing::info!("✓ Payment provider configured");

    // Purchase flow
    let checkout = Arc::new(CheckoutInitiator::new(
        gateway,
        articles.clone(),
        entitlements.clone(),
        config.site_url.clone(),
        config.currency.clone(),
    ));
    let webhook = Arc::new(WebhookHandler::new(
        entitlements.clone(),
        config.webhook_secret.clone(),
    ));

    // Build application state
    let state = AppState {
        articles,
        entitlements,
        identity,
        checkout,
        webhook,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/articles/{id}", get(get_article))
        .route("/purchase/{id}", post(create_purchase))
        .route("/webhooks/payment", post(payment_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("🚀 folio server running on http://{}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  GET  /articles/{{id}}    - Read article (gated)");
    tracing::info!("  POST /purchase/{{id}}    - Create checkout session");
    tracing::info!("  POST /webhooks/payment - Payment notifications");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed the article store from a JSON file of articles
async fn seed_articles(store: &MemoryArticleStore, path: &str) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)?;
    let articles: Vec<Article> = serde_json::from_str(&raw)?;
    let count = articles.len();

    for article in articles {
        store.insert(article).await?;
    }

    Ok(count)
}
