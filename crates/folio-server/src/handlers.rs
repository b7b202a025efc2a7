//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use folio_core::{access, AccessDecision, Article, ArticleId, ArticleStore, UserId};
use folio_payments::{PaymentError, WebhookOutcome};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Article as rendered to one specific viewer
///
/// `content` is omitted entirely when the purchase guard decides the
/// viewer has no access; the excerpt and price carry the offer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub price: i64,
    pub published: bool,
    pub user_id: String,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleResponse {
    fn readable(article: Article) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title,
            content: Some(article.content),
            excerpt: article.excerpt,
            price: article.price,
            published: article.published,
            user_id: article.user_id.to_string(),
            locked: false,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }

    fn locked(article: Article) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title,
            content: None,
            excerpt: article.excerpt,
            price: article.price,
            published: article.published,
            user_id: article.user_id.to_string(),
            locked: true,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub checkout_url: String,
    pub session_id: String,
}

/// Acknowledgement body for the payment provider
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

// ============================================================================
// Error Mapping
// ============================================================================

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: PaymentError) -> HandlerError {
    let (status, code) = match &err {
        PaymentError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        PaymentError::ArticleNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        PaymentError::FreeContent => (StatusCode::BAD_REQUEST, "FREE_CONTENT"),
        PaymentError::AlreadyOwned => (StatusCode::CONFLICT, "ALREADY_OWNED"),
        PaymentError::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
        PaymentError::InvalidMetadata(_) => (StatusCode::BAD_REQUEST, "INVALID_METADATA"),
        PaymentError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
        PaymentError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        PaymentError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
    };

    if err.is_retryable() {
        tracing::error!(code, error = %err, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message().into(),
            code: code.into(),
        }),
    )
}

fn not_found() -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Article not found.".into(),
            code: "NOT_FOUND".into(),
        }),
    )
}

// ============================================================================
// Identity
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the requesting user, if any
///
/// A missing or unrecognized token is an anonymous viewer; only an
/// unreachable identity service is an error.
async fn resolve_viewer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<UserId>, HandlerError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    state.identity.resolve(token).await.map_err(|e| {
        tracing::error!(error = %e, "Identity resolution failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Could not verify session. Please try again.".into(),
                code: "IDENTITY_ERROR".into(),
            }),
        )
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Read an article, gated by the purchase guard
///
/// The guard runs on every request; entitlements land asynchronously via
/// the webhook, so nothing here is cached.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ArticleResponse>, HandlerError> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let article_id = ArticleId::from_string(id);

    let article = state
        .articles
        .find(&article_id)
        .await
        .map_err(|e| error_response(PaymentError::Storage(e.to_string())))?
        .ok_or_else(not_found)?;

    let decision = access::evaluate(&article, viewer.as_ref(), state.entitlements.as_ref())
        .await
        .map_err(|e| error_response(PaymentError::Storage(e.to_string())))?;

    match decision {
        AccessDecision::Readable => Ok(Json(ArticleResponse::readable(article))),
        AccessDecision::PurchaseRequired => Ok(Json(ArticleResponse::locked(article))),
        // Same body as a missing id so draft existence never leaks.
        AccessDecision::NotFound => Err(not_found()),
    }
}

/// Create a provider checkout session for a paid article
pub async fn create_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PurchaseResponse>, HandlerError> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let article_id = ArticleId::from_string(id);

    let session = state
        .checkout
        .initiate(&article_id, viewer.as_ref())
        .await
        .map_err(error_response)?;

    Ok(Json(PurchaseResponse {
        checkout_url: session.checkout_url,
        session_id: session.session_id,
    }))
}

/// Payment provider webhook
///
/// No user session: trust comes from the signature header alone. Ignored
/// and duplicate events are acknowledged 2xx so the provider stops
/// retrying; only signature/metadata rejections and store failures get an
/// error status.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, HandlerError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing signature header".into(),
                    code: "MISSING_SIGNATURE".into(),
                }),
            )
        })?;

    let outcome = state
        .webhook
        .handle(&body, signature)
        .await
        .map_err(error_response)?;

    let ack = match outcome {
        WebhookOutcome::Created { session_id } => WebhookAck {
            status: "created",
            session_id: Some(session_id),
            event_type: None,
        },
        WebhookOutcome::AlreadyProcessed { session_id } => WebhookAck {
            status: "already_processed",
            session_id: Some(session_id),
            event_type: None,
        },
        WebhookOutcome::Ignored { event_type } => WebhookAck {
            status: "ignored",
            session_id: None,
            event_type: Some(event_type),
        },
    };

    Ok(Json(ack))
}
