//! Application State

use std::sync::Arc;

use folio_core::{IdentityProvider, MemoryArticleStore, MemoryEntitlementStore};
use folio_payments::{CheckoutInitiator, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Article store
    pub articles: Arc<MemoryArticleStore>,

    /// Entitlement store; the sole source of truth for purchases
    pub entitlements: Arc<MemoryEntitlementStore>,

    /// Session-token resolver (external identity service)
    pub identity: Arc<dyn IdentityProvider>,

    /// Checkout session initiator
    pub checkout: Arc<CheckoutInitiator>,

    /// Payment notification processor
    pub webhook: Arc<WebhookHandler<MemoryEntitlementStore>>,
}
