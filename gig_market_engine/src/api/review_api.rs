use log::*;

use crate::{
    db_types::{NewReview, Review, UserId},
    traits::{LedgerError, MarketplaceError, ReviewManagement},
};

/// Reviews live outside the order flow, but the engine owns them because a review is only valid
/// against a completed order, and because posting one recomputes the gig's and the freelancer's
/// rating aggregates.
#[derive(Debug, Clone)]
pub struct ReviewApi<B> {
    db: B,
}

impl<B> ReviewApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReviewApi<B>
where B: ReviewManagement
{
    /// Posts a review for a completed order. Only the order's client may review, each order
    /// carries at most one review, and ratings run from 1 to 5.
    pub async fn add_review(&self, review: NewReview, author: UserId) -> Result<Review, MarketplaceError> {
        if !(1..=5).contains(&review.rating) {
            return Err(MarketplaceError::InvalidRating(review.rating));
        }
        let review = self.db.create_review(review, author).await?;
        info!("🔄️⭐️ Review {} posted ({}⭐️)", review.id, review.rating);
        Ok(review)
    }

    pub async fn reviews_for_freelancer(&self, freelancer_id: UserId) -> Result<Vec<Review>, LedgerError> {
        self.db.fetch_reviews_for_freelancer(freelancer_id).await
    }
}
