//! Payment Error Types

use thiserror::Error;

use folio_core::{ArticleId, CoreError};

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// No authenticated user where one is required
    #[error("Authentication required")]
    Unauthorized,

    /// Article missing, or a draft invisible to the requesting user
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    /// Attempt to purchase content that is free
    #[error("Article is free")]
    FreeContent,

    /// The user already owns the article or wrote it
    #[error("Article already owned")]
    AlreadyOwned,

    /// Payment provider API error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    InvalidSignature(String),

    /// Well-signed webhook missing required correlation data
    #[error("Webhook metadata invalid: {0}")]
    InvalidMetadata(String),

    /// Durable store unreachable or rejected a write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    ///
    /// The webhook response status depends on this: the provider retries
    /// 5xx responses and must not retry signature or metadata rejections.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Provider(_) | PaymentError::Storage(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Unauthorized => "Please sign in to purchase this article.",
            PaymentError::ArticleNotFound(_) => "Article not found.",
            PaymentError::FreeContent => "This article is free and does not require purchase.",
            PaymentError::AlreadyOwned => "You already own this article.",
            PaymentError::Provider(_) => "Payment processing failed. Please try again.",
            PaymentError::InvalidSignature(_) => "Webhook signature verification failed.",
            PaymentError::InvalidMetadata(_) => "Webhook payload is missing purchase metadata.",
            PaymentError::Storage(_) => "A storage error occurred. Please try again.",
            PaymentError::Config(_) => "Service configuration error.",
        }
    }
}

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        PaymentError::Storage(err.to_string())
    }
}
