use crate::{
    db_types::{NewReview, Review, UserId},
    traits::{LedgerError, MarketplaceError},
};

/// Post-completion reviews. One review per order, written by the order's client, and only once
/// the order is completed. Rating aggregates on the gig and the freelancer are recomputed from
/// the full review set whenever a review lands; they are never rolled forward incrementally.
#[allow(async_fn_in_trait)]
pub trait ReviewManagement {
    /// Creates a review for a completed order and recomputes the gig's and freelancer's rating
    /// aggregates in the same transaction. The author must be the order's client.
    async fn create_review(&self, review: NewReview, author: UserId) -> Result<Review, MarketplaceError>;

    /// Fetches all reviews left on the given freelancer's completed orders, most recent first.
    async fn fetch_reviews_for_freelancer(&self, freelancer_id: UserId) -> Result<Vec<Review>, LedgerError>;
}
