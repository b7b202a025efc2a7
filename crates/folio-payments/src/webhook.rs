//! Payment Webhook Handling
//!
//! Processes asynchronous completion notifications from the payment
//! provider. The endpoint is invoked by the provider, not by a user: the
//! signature over the raw body is the only authentication, and delivery
//! is at-least-once, so the same event may arrive any number of times.
//!
//! Gates run in a fixed order and each one is hard: signature, event-type
//! filter, metadata extraction, duplicate check, insert. No side effect
//! happens before the signature gate passes.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use folio_core::{ArticleId, Entitlement, EntitlementStore, InsertOutcome, UserId};

use crate::checkout::{METADATA_ARTICLE_ID, METADATA_USER_ID};
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// The one event type that carries business logic
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Maximum accepted age of a signed notification, in seconds
const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Result of processing one notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A new entitlement row was written
    Created { session_id: String },

    /// The session was already recorded; duplicate delivery, no write
    AlreadyProcessed { session_id: String },

    /// Event type without business logic; acknowledged and dropped
    Ignored { event_type: String },
}

/// Signature header fields: `t=<unix>,v1=<hex>[,v1=<hex>...]`
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for field in header.split(',') {
            match field.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        PaymentError::InvalidSignature("non-numeric timestamp".into())
                    })?);
                }
                Some(("v1", value)) => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                // Unknown schemes (v0 etc.) are allowed and skipped.
                Some(_) => {}
                None => {
                    return Err(PaymentError::InvalidSignature(
                        "malformed signature header".into(),
                    ));
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            PaymentError::InvalidSignature("missing timestamp field".into())
        })?;

        if signatures.is_empty() {
            return Err(PaymentError::InvalidSignature(
                "missing v1 signature field".into(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Verify a provider signature over `payload`
///
/// The signed message is `{timestamp}.{payload}`; the timestamp bounds
/// replay of captured deliveries.
fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
) -> Result<()> {
    let header = SignatureHeader::parse(header)?;

    let age = (chrono::Utc::now().timestamp() - header.timestamp).abs();
    if age > tolerance_secs {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    for signature in &header.signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(PaymentError::InvalidSignature(
        "no matching signature".into(),
    ))
}

/// Raw notification envelope
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: SessionObject,
}

/// The checkout-session object inside a completion event
#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

/// Webhook handler
pub struct WebhookHandler<S: EntitlementStore> {
    entitlements: Arc<S>,
    signing_secret: String,
    tolerance_secs: i64,
}

impl<S: EntitlementStore> WebhookHandler<S> {
    pub fn new(entitlements: Arc<S>, signing_secret: impl Into<String>) -> Self {
        Self {
            entitlements,
            signing_secret: signing_secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Override the replay tolerance window
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Process one raw notification
    ///
    /// Safe to invoke any number of times for the same underlying payment:
    /// every invocation after the first reports `AlreadyProcessed` and the
    /// store ends up with exactly one row for the session id.
    pub async fn handle(&self, payload: &str, signature_header: &str) -> Result<WebhookOutcome> {
        if let Err(err) = verify_signature(
            &self.signing_secret,
            payload.as_bytes(),
            signature_header,
            self.tolerance_secs,
        ) {
            tracing::warn!(error = %err, "Rejected webhook with bad signature");
            return Err(err);
        }

        let event: EventEnvelope = serde_json::from_str(payload).map_err(|e| {
            PaymentError::InvalidMetadata(format!("malformed event payload: {e}"))
        })?;

        tracing::info!(event_type = %event.event_type, "Processing payment webhook");

        if event.event_type != CHECKOUT_COMPLETED {
            tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let session = event.data.object;
        let metadata = session.metadata.unwrap_or_default();

        let article_id = metadata.get(METADATA_ARTICLE_ID).ok_or_else(|| {
            PaymentError::InvalidMetadata(format!(
                "{METADATA_ARTICLE_ID} missing from session metadata"
            ))
        })?;
        let user_id = metadata.get(METADATA_USER_ID).ok_or_else(|| {
            PaymentError::InvalidMetadata(format!(
                "{METADATA_USER_ID} missing from session metadata"
            ))
        })?;

        let amount = session
            .amount_total
            .ok_or_else(|| PaymentError::InvalidMetadata("amount_total missing".into()))?;
        let currency = session
            .currency
            .ok_or_else(|| PaymentError::InvalidMetadata("currency missing".into()))?;

        // Duplicate delivery: the session was already recorded.
        if self
            .entitlements
            .find_by_session_id(&session.id)
            .await?
            .is_some()
        {
            tracing::info!(session_id = %session.id, "Duplicate webhook delivery");
            return Ok(WebhookOutcome::AlreadyProcessed {
                session_id: session.id,
            });
        }

        let entitlement = Entitlement::new(
            ArticleId::from_string(article_id.clone()),
            UserId::from_string(user_id.clone()),
            amount,
            currency,
            session.id.clone(),
        );

        // The store's uniqueness on session id is the backstop for the
        // window between the check above and this insert.
        match self.entitlements.insert_if_absent(entitlement).await? {
            InsertOutcome::Created => {
                tracing::info!(
                    session_id = %session.id,
                    article_id = %article_id,
                    user_id = %user_id,
                    amount,
                    "Created entitlement"
                );
                Ok(WebhookOutcome::Created {
                    session_id: session.id,
                })
            }
            InsertOutcome::AlreadyExists => {
                tracing::info!(session_id = %session.id, "Lost insert race to duplicate delivery");
                Ok(WebhookOutcome::AlreadyProcessed {
                    session_id: session.id,
                })
            }
        }
    }
}
