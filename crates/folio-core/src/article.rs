//! Article Model
//!
//! Typed replacement for the loose article rows returned by the managed
//! backend. Article editing itself lives outside this core; the store
//! trait exposes only what the purchase flow needs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::identity::UserId;

/// Unique article identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleId(String);

impl ArticleId {
    /// Generate a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A published or draft article
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: ArticleId,

    /// Title, also used as the checkout line-item name
    pub title: String,

    /// Full body content (gated when `price > 0`)
    pub content: String,

    /// Short teaser shown to viewers without access
    pub excerpt: Option<String>,

    /// Price in the minor currency unit; 0 means free
    pub price: i64,

    /// Whether the article is visible to anyone but its owner
    pub published: bool,

    /// Owning user id
    pub user_id: UserId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a new unpublished article
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        price: i64,
        user_id: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ArticleId::new(),
            title: title.into(),
            content: content.into(),
            excerpt: None,
            price,
            published: false,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether reading this article requires a purchase
    pub fn is_paid(&self) -> bool {
        self.price > 0
    }
}

/// Article storage trait
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up an article by id
    async fn find(&self, id: &ArticleId) -> Result<Option<Article>>;

    /// Insert an article (seeding and tests)
    async fn insert(&self, article: Article) -> Result<()>;
}

/// In-memory article store (for development)
#[derive(Default)]
pub struct MemoryArticleStore {
    articles: RwLock<HashMap<ArticleId, Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn find(&self, id: &ArticleId) -> Result<Option<Article>> {
        let articles = self.articles.read().unwrap();
        Ok(articles.get(id).cloned())
    }

    async fn insert(&self, article: Article) -> Result<()> {
        let mut articles = self.articles.write().unwrap();
        articles.insert(article.id.clone(), article);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_round_trip() {
        let store = MemoryArticleStore::new();
        let article = Article::new("Title", "Body", 500, UserId::from_string("u1"));
        let id = article.id.clone();

        store.insert(article).await.unwrap();

        let found = store.find(&id).await.unwrap().unwrap();
        assert_eq!(found.title, "Title");
        assert!(found.is_paid());
        assert!(!found.published);

        let missing = store.find(&ArticleId::new()).await.unwrap();
        assert!(missing.is_none());
    }
}
