//! Entitlement Store
//!
//! Durable purchase records: the sole source of truth for "has user U
//! paid for article A". Rows are inserted exactly once, keyed by the
//! external checkout session id, and never updated or deleted.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::article::ArticleId;
use crate::error::Result;
use crate::identity::UserId;

/// Entitlement lifecycle status
///
/// Only a terminal `Completed` value is ever produced; the variant exists
/// so stored rows carry an explicit status column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    Completed,
}

/// A durable purchase record granting a user read access to an article
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entitlement {
    /// Purchased article
    pub article_id: ArticleId,

    /// Purchasing user
    pub user_id: UserId,

    /// Amount paid, in the minor currency unit
    pub amount: i64,

    /// Lowercase ISO currency code
    pub currency: String,

    /// External checkout session id; the idempotency key
    pub session_id: String,

    /// Lifecycle status
    pub status: EntitlementStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Entitlement {
    /// Create a completed entitlement for a verified payment
    pub fn new(
        article_id: ArticleId,
        user_id: UserId,
        amount: i64,
        currency: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            article_id,
            user_id,
            amount,
            currency: currency.into(),
            session_id: session_id.into(),
            status: EntitlementStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of an idempotent insert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Created,

    /// A row with the same session id already exists; nothing was written
    AlreadyExists,
}

/// Entitlement storage trait
///
/// `insert_if_absent` is the only mutation primitive. Writers must treat
/// `AlreadyExists` as success: the provider delivers completion events
/// at-least-once and duplicates are expected.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Insert unless a row with the same session id exists
    async fn insert_if_absent(&self, entitlement: Entitlement) -> Result<InsertOutcome>;

    /// Look up by external checkout session id
    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Entitlement>>;

    /// Look up by (article, user) pair
    async fn find_by_article_and_user(
        &self,
        article_id: &ArticleId,
        user_id: &UserId,
    ) -> Result<Option<Entitlement>>;
}

/// In-memory entitlement store (for development)
#[derive(Default)]
pub struct MemoryEntitlementStore {
    by_session: RwLock<HashMap<String, Entitlement>>,
    by_article_user: RwLock<HashMap<(ArticleId, UserId), String>>,
}

impl MemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntitlementStore for MemoryEntitlementStore {
    async fn insert_if_absent(&self, entitlement: Entitlement) -> Result<InsertOutcome> {
        // Uniqueness check and insert under a single write lock; this is
        // the backstop for concurrent duplicate deliveries.
        let mut by_session = self.by_session.write().unwrap();
        if by_session.contains_key(&entitlement.session_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let mut by_article_user = self.by_article_user.write().unwrap();
        by_article_user.insert(
            (entitlement.article_id.clone(), entitlement.user_id.clone()),
            entitlement.session_id.clone(),
        );
        by_session.insert(entitlement.session_id.clone(), entitlement);

        Ok(InsertOutcome::Created)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Entitlement>> {
        let by_session = self.by_session.read().unwrap();
        Ok(by_session.get(session_id).cloned())
    }

    async fn find_by_article_and_user(
        &self,
        article_id: &ArticleId,
        user_id: &UserId,
    ) -> Result<Option<Entitlement>> {
        let by_article_user = self.by_article_user.read().unwrap();
        let by_session = self.by_session.read().unwrap();

        if let Some(session_id) = by_article_user.get(&(article_id.clone(), user_id.clone())) {
            Ok(by_session.get(session_id).cloned())
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entitlement(session_id: &str) -> Entitlement {
        Entitlement::new(
            ArticleId::from_string("a1"),
            UserId::from_string("u1"),
            500,
            "jpy",
            session_id,
        )
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_on_session_id() {
        let store = MemoryEntitlementStore::new();

        let first = store.insert_if_absent(entitlement("cs_1")).await.unwrap();
        assert_eq!(first, InsertOutcome::Created);

        let second = store.insert_if_absent(entitlement("cs_1")).await.unwrap();
        assert_eq!(second, InsertOutcome::AlreadyExists);

        let found = store.find_by_session_id("cs_1").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_find_by_article_and_user() {
        let store = MemoryEntitlementStore::new();
        store.insert_if_absent(entitlement("cs_1")).await.unwrap();

        let article = ArticleId::from_string("a1");
        let owner = UserId::from_string("u1");
        let other = UserId::from_string("u2");

        assert!(store
            .find_by_article_and_user(&article, &owner)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_article_and_user(&article, &other)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pair_with_distinct_sessions_keeps_both_rows() {
        let store = MemoryEntitlementStore::new();
        store.insert_if_absent(entitlement("cs_1")).await.unwrap();

        let outcome = store.insert_if_absent(entitlement("cs_2")).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Created);

        assert!(store.find_by_session_id("cs_1").await.unwrap().is_some());
        assert!(store.find_by_session_id("cs_2").await.unwrap().is_some());
    }
}
