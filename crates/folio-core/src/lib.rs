//! # folio-core
//!
//! Domain model and store abstractions for the folio publishing platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Purchase Guard                          │
//! │  ┌─────────────┐  ┌───────────────────┐  ┌───────────────┐   │
//! │  │   Article   │  │  EntitlementStore │  │   Identity    │   │
//! │  │   Store     │──│   (Strategy)      │──│   Provider    │   │
//! │  └─────────────┘  └───────────────────┘  └───────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store and identity traits let the HTTP layer swap the managed
//! backend for in-memory doubles without touching the access-control or
//! payment logic built on top of them.

pub mod access;
pub mod article;
pub mod entitlement;
pub mod error;
pub mod identity;

pub use access::AccessDecision;
pub use article::{Article, ArticleId, ArticleStore, MemoryArticleStore};
pub use entitlement::{
    Entitlement, EntitlementStatus, EntitlementStore, InsertOutcome, MemoryEntitlementStore,
};
pub use error::{CoreError, Result};
pub use identity::{IdentityProvider, StaticIdentityProvider, UserId};
