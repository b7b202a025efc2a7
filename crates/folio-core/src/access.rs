//! Purchase Guard
//!
//! The access-control decision evaluated on every gated content read.
//! Entitlement state changes out-of-band from the viewer's own requests,
//! so the decision is recomputed per request and never cached.

use crate::article::Article;
use crate::entitlement::EntitlementStore;
use crate::error::Result;
use crate::identity::UserId;

/// Outcome of the purchase guard for one (article, viewer) pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    /// Full content may be rendered
    Readable,

    /// Paid content the viewer has not purchased; present the offer
    PurchaseRequired,

    /// Draft invisible to this viewer; indistinguishable from a missing id
    NotFound,
}

/// Evaluate whether `viewer` may read `article`
///
/// Rules, first match wins:
/// 1. unpublished and not the owner: `NotFound` (draft existence must not
///    leak, so this precedes the free-content rule)
/// 2. free article: `Readable`
/// 3. the owner: `Readable`
/// 4. viewer holds an entitlement: `Readable`
/// 5. otherwise: `PurchaseRequired`
pub async fn evaluate(
    article: &Article,
    viewer: Option<&UserId>,
    entitlements: &dyn EntitlementStore,
) -> Result<AccessDecision> {
    let is_owner = viewer.is_some_and(|v| *v == article.user_id);

    if !article.published && !is_owner {
        return Ok(AccessDecision::NotFound);
    }

    if article.price == 0 {
        return Ok(AccessDecision::Readable);
    }

    if is_owner {
        return Ok(AccessDecision::Readable);
    }

    if let Some(viewer) = viewer {
        if entitlements
            .find_by_article_and_user(&article.id, viewer)
            .await?
            .is_some()
        {
            return Ok(AccessDecision::Readable);
        }
    }

    Ok(AccessDecision::PurchaseRequired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::{Entitlement, MemoryEntitlementStore};

    fn owner() -> UserId {
        UserId::from_string("owner")
    }

    fn reader() -> UserId {
        UserId::from_string("reader")
    }

    fn article(price: i64, published: bool) -> Article {
        let mut article = Article::new("Title", "Body", price, owner());
        article.published = published;
        article
    }

    #[tokio::test]
    async fn test_free_article_readable_by_anyone() {
        let store = MemoryEntitlementStore::new();
        let article = article(0, true);

        let anonymous = evaluate(&article, None, &store).await.unwrap();
        assert_eq!(anonymous, AccessDecision::Readable);

        let authenticated = evaluate(&article, Some(&reader()), &store).await.unwrap();
        assert_eq!(authenticated, AccessDecision::Readable);
    }

    #[tokio::test]
    async fn test_paid_article_requires_purchase() {
        let store = MemoryEntitlementStore::new();
        let article = article(500, true);

        let anonymous = evaluate(&article, None, &store).await.unwrap();
        assert_eq!(anonymous, AccessDecision::PurchaseRequired);

        let authenticated = evaluate(&article, Some(&reader()), &store).await.unwrap();
        assert_eq!(authenticated, AccessDecision::PurchaseRequired);
    }

    #[tokio::test]
    async fn test_owner_reads_own_paid_article() {
        let store = MemoryEntitlementStore::new();
        let article = article(500, true);

        let decision = evaluate(&article, Some(&owner()), &store).await.unwrap();
        assert_eq!(decision, AccessDecision::Readable);
    }

    #[tokio::test]
    async fn test_entitlement_holder_reads_paid_article() {
        let store = MemoryEntitlementStore::new();
        let article = article(500, true);

        store
            .insert_if_absent(Entitlement::new(
                article.id.clone(),
                reader(),
                500,
                "jpy",
                "cs_1",
            ))
            .await
            .unwrap();

        let decision = evaluate(&article, Some(&reader()), &store).await.unwrap();
        assert_eq!(decision, AccessDecision::Readable);
    }

    #[tokio::test]
    async fn test_draft_hidden_from_everyone_but_owner() {
        let store = MemoryEntitlementStore::new();
        let article = article(500, false);

        let anonymous = evaluate(&article, None, &store).await.unwrap();
        assert_eq!(anonymous, AccessDecision::NotFound);

        let authenticated = evaluate(&article, Some(&reader()), &store).await.unwrap();
        assert_eq!(authenticated, AccessDecision::NotFound);

        let as_owner = evaluate(&article, Some(&owner()), &store).await.unwrap();
        assert_eq!(as_owner, AccessDecision::Readable);
    }

    #[tokio::test]
    async fn test_free_draft_still_hidden() {
        let store = MemoryEntitlementStore::new();
        let article = article(0, false);

        let decision = evaluate(&article, Some(&reader()), &store).await.unwrap();
        assert_eq!(decision, AccessDecision::NotFound);
    }
}
