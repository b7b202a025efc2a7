//! Checkout Session Initiation
//!
//! Opens a provider-hosted checkout session for a priced article after
//! rejecting requests that could never turn into a valid purchase. The
//! session carries `articleId`/`userId` metadata; the webhook handler has
//! no other way to learn which purchase a completion event belongs to.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency,
};

use folio_core::{ArticleId, ArticleStore, EntitlementStore, UserId};

use crate::error::{PaymentError, Result};

/// Metadata key carrying the purchased article id
pub const METADATA_ARTICLE_ID: &str = "articleId";

/// Metadata key carrying the purchasing user id
pub const METADATA_USER_ID: &str = "userId";

/// Inputs for one provider checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutParams {
    /// Article being purchased
    pub article_id: ArticleId,

    /// Purchasing user
    pub user_id: UserId,

    /// Price in the minor currency unit
    pub amount: i64,

    /// Lowercase ISO currency code
    pub currency: String,

    /// Line-item name shown on the hosted page
    pub title: String,

    /// Redirect after successful payment
    pub success_url: String,

    /// Redirect if checkout is abandoned
    pub cancel_url: String,
}

/// Provider-side session handle returned to the caller for redirect
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderSession {
    /// External checkout session id; later the entitlement idempotency key
    pub session_id: String,

    /// Hosted checkout page URL
    pub checkout_url: String,
}

/// Outbound payment-provider interface
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session
    async fn create_session(&self, params: CheckoutParams) -> Result<ProviderSession>;
}

/// Stripe gateway
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY is not set".into()))?;

        Ok(Self::new(&secret_key))
    }
}

fn currency_from_code(code: &str) -> Result<Currency> {
    match code.to_ascii_lowercase().as_str() {
        "jpy" => Ok(Currency::JPY),
        "usd" => Ok(Currency::USD),
        "eur" => Ok(Currency::EUR),
        "gbp" => Ok(Currency::GBP),
        other => Err(PaymentError::Config(format!(
            "unsupported currency: {other}"
        ))),
    }
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    async fn create_session(&self, params: CheckoutParams) -> Result<ProviderSession> {
        let currency = currency_from_code(&params.currency)?;

        let mut create = CreateCheckoutSession::new();
        create.success_url = Some(&params.success_url);
        create.cancel_url = Some(&params.cancel_url);
        create.mode = Some(CheckoutSessionMode::Payment);

        // The reconciliation channel: the completion event echoes this map.
        let mut metadata = HashMap::new();
        metadata.insert(
            METADATA_ARTICLE_ID.to_string(),
            params.article_id.to_string(),
        );
        metadata.insert(METADATA_USER_ID.to_string(), params.user_id.to_string());
        create.metadata = Some(metadata);

        create.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(params.amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: params.title.clone(),
                    description: Some("Article purchase".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, create)
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let checkout_url = session
            .url
            .ok_or_else(|| PaymentError::Provider("No checkout URL returned".into()))?;

        Ok(ProviderSession {
            session_id: session.id.to_string(),
            checkout_url,
        })
    }
}

/// Opens checkout sessions after enforcing purchase preconditions
///
/// Creating a session has no effect on the entitlement store; entitlement
/// is only ever written by the webhook handler once payment completes.
pub struct CheckoutInitiator {
    gateway: Arc<dyn CheckoutGateway>,
    articles: Arc<dyn ArticleStore>,
    entitlements: Arc<dyn EntitlementStore>,
    site_url: String,
    currency: String,
}

impl CheckoutInitiator {
    pub fn new(
        gateway: Arc<dyn CheckoutGateway>,
        articles: Arc<dyn ArticleStore>,
        entitlements: Arc<dyn EntitlementStore>,
        site_url: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            articles,
            entitlements,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            currency: currency.into(),
        }
    }

    /// Open a checkout session for `article_id` on behalf of `viewer`
    ///
    /// Preconditions, in order: the viewer is authenticated, the article
    /// exists (drafts count as missing for non-owners), the article is
    /// paid, and the viewer neither wrote it nor already owns it. Only
    /// then is the provider contacted.
    pub async fn initiate(
        &self,
        article_id: &ArticleId,
        viewer: Option<&UserId>,
    ) -> Result<ProviderSession> {
        let user = viewer.ok_or(PaymentError::Unauthorized)?;

        let article = self
            .articles
            .find(article_id)
            .await?
            .ok_or_else(|| PaymentError::ArticleNotFound(article_id.clone()))?;

        if !article.published && article.user_id != *user {
            return Err(PaymentError::ArticleNotFound(article_id.clone()));
        }

        if article.price == 0 {
            return Err(PaymentError::FreeContent);
        }

        if article.user_id == *user {
            return Err(PaymentError::AlreadyOwned);
        }

        if self
            .entitlements
            .find_by_article_and_user(article_id, user)
            .await?
            .is_some()
        {
            return Err(PaymentError::AlreadyOwned);
        }

        let params = CheckoutParams {
            article_id: article.id.clone(),
            user_id: user.clone(),
            amount: article.price,
            currency: self.currency.clone(),
            title: article.title.clone(),
            success_url: format!("{}/articles/{}?success=true", self.site_url, article.id),
            cancel_url: format!("{}/articles/{}?canceled=true", self.site_url, article.id),
        };

        let session = self.gateway.create_session(params).await?;

        tracing::info!(
            article_id = %article.id,
            user_id = %user,
            session_id = %session.session_id,
            "Created checkout session"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use folio_core::{Article, MemoryArticleStore, MemoryEntitlementStore};
    use folio_core::entitlement::Entitlement;

    /// Gateway double that records every session it is asked to create
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<CheckoutParams>>,
    }

    impl RecordingGateway {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> CheckoutParams {
            self.calls.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckoutGateway for RecordingGateway {
        async fn create_session(&self, params: CheckoutParams) -> Result<ProviderSession> {
            self.calls.lock().unwrap().push(params);
            Ok(ProviderSession {
                session_id: "cs_test".into(),
                checkout_url: "https://checkout.example.com/cs_test".into(),
            })
        }
    }

    struct Fixture {
        gateway: Arc<RecordingGateway>,
        articles: Arc<MemoryArticleStore>,
        entitlements: Arc<MemoryEntitlementStore>,
        initiator: CheckoutInitiator,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(RecordingGateway::default());
        let articles = Arc::new(MemoryArticleStore::new());
        let entitlements = Arc::new(MemoryEntitlementStore::new());
        let initiator = CheckoutInitiator::new(
            gateway.clone(),
            articles.clone(),
            entitlements.clone(),
            "https://folio.example.com/",
            "jpy",
        );
        Fixture {
            gateway,
            articles,
            entitlements,
            initiator,
        }
    }

    fn owner() -> UserId {
        UserId::from_string("owner")
    }

    fn buyer() -> UserId {
        UserId::from_string("buyer")
    }

    async fn seed_article(fixture: &Fixture, price: i64, published: bool) -> ArticleId {
        let mut article = Article::new("Paid Article", "Body", price, owner());
        article.published = published;
        let id = article.id.clone();
        fixture.articles.insert(article).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_anonymous_viewer_rejected() {
        let fixture = fixture();
        let id = seed_article(&fixture, 500, true).await;

        let err = fixture.initiator.initiate(&id, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Unauthorized));
        assert_eq!(fixture.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_article_rejected() {
        let fixture = fixture();
        let missing = ArticleId::from_string("nope");

        let err = fixture
            .initiator
            .initiate(&missing, Some(&buyer()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ArticleNotFound(_)));
    }

    #[tokio::test]
    async fn test_draft_looks_missing_to_non_owner() {
        let fixture = fixture();
        let id = seed_article(&fixture, 500, false).await;

        let err = fixture
            .initiator
            .initiate(&id, Some(&buyer()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ArticleNotFound(_)));
    }

    #[tokio::test]
    async fn test_free_article_rejected() {
        let fixture = fixture();
        let id = seed_article(&fixture, 0, true).await;

        let err = fixture
            .initiator
            .initiate(&id, Some(&buyer()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::FreeContent));
    }

    #[tokio::test]
    async fn test_author_cannot_buy_own_article() {
        let fixture = fixture();
        let id = seed_article(&fixture, 500, true).await;

        let err = fixture
            .initiator
            .initiate(&id, Some(&owner()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyOwned));
        assert_eq!(fixture.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_entitlement_blocks_second_purchase() {
        let fixture = fixture();
        let id = seed_article(&fixture, 500, true).await;

        fixture
            .entitlements
            .insert_if_absent(Entitlement::new(id.clone(), buyer(), 500, "jpy", "cs_prev"))
            .await
            .unwrap();

        let err = fixture
            .initiator
            .initiate(&id, Some(&buyer()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyOwned));
        assert_eq!(fixture.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_initiation_embeds_reconciliation_data() {
        let fixture = fixture();
        let id = seed_article(&fixture, 500, true).await;

        let session = fixture
            .initiator
            .initiate(&id, Some(&buyer()))
            .await
            .unwrap();
        assert_eq!(session.checkout_url, "https://checkout.example.com/cs_test");

        let params = fixture.gateway.last_call();
        assert_eq!(params.article_id, id);
        assert_eq!(params.user_id, buyer());
        assert_eq!(params.amount, 500);
        assert_eq!(params.currency, "jpy");
        assert_eq!(
            params.success_url,
            format!("https://folio.example.com/articles/{id}?success=true")
        );
        assert_eq!(
            params.cancel_url,
            format!("https://folio.example.com/articles/{id}?canceled=true")
        );
    }

    #[test]
    fn test_currency_codes() {
        assert!(currency_from_code("jpy").is_ok());
        assert!(currency_from_code("USD").is_ok());
        assert!(matches!(
            currency_from_code("xxx"),
            Err(PaymentError::Config(_))
        ));
    }
}
