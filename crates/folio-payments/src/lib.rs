//! # folio-payments
//!
//! Checkout initiation and payment webhook processing for folio.
//!
//! ## Purchase flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  Your Site  │────▶│  Hosted Provider │────▶│  Your Site       │
//! │  (article)  │     │  Checkout Page   │     │  (success)       │
//! └─────────────┘     └────────┬─────────┘     └──────────────────┘
//!                              │ async, signed
//!                              ▼
//!                     ┌──────────────────┐     ┌──────────────────┐
//!                     │  Webhook Handler │────▶│ Entitlement Store │
//!                     └──────────────────┘     └──────────────────┘
//! ```
//!
//! The webhook arrives on a separate, unauthenticated channel: the only
//! link back to the purchase is the `articleId`/`userId` metadata embedded
//! when the checkout session was created, and the only authentication is
//! the provider's signature over the raw body. Delivery is at-least-once,
//! so the handler is idempotent on the checkout session id.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_payments::{CheckoutInitiator, StripeGateway, WebhookHandler};
//!
//! let gateway = Arc::new(StripeGateway::new("sk_test_xxx"));
//! let initiator = CheckoutInitiator::new(gateway, articles, entitlements,
//!     "https://folio.example.com", "jpy");
//!
//! // Redirect the viewer to session.checkout_url
//! let session = initiator.initiate(&article_id, Some(&user)).await?;
//!
//! // Later, on POST /webhooks/payment:
//! let handler = WebhookHandler::new(entitlements, "whsec_xxx");
//! let outcome = handler.handle(&raw_body, signature_header).await?;
//! ```

mod checkout;
mod error;
mod webhook;

pub use checkout::{
    CheckoutGateway, CheckoutInitiator, CheckoutParams, ProviderSession, StripeGateway,
    METADATA_ARTICLE_ID, METADATA_USER_ID,
};
pub use error::{PaymentError, Result};
pub use webhook::{WebhookHandler, WebhookOutcome, CHECKOUT_COMPLETED};
