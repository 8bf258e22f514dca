use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{GigId, NewReview, Review, UserId},
    traits::MarketplaceError,
};

pub async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<Review, MarketplaceError> {
    let order_id = review.order_id;
    let review = sqlx::query_as(
        r#"
            INSERT INTO reviews (order_id, rating, comment) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(review.order_id)
    .bind(review.rating)
    .bind(review.comment)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => MarketplaceError::ReviewAlreadyExists(order_id),
        _ => MarketplaceError::from(e),
    })?;
    Ok(review)
}

/// Recomputes the gig's rating aggregates from the full review set. The recompute is the
/// authoritative aggregation method; nothing rolls these numbers forward incrementally.
pub async fn recompute_gig_rating(gig_id: GigId, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"
            UPDATE gigs
            SET rating = COALESCE(
                    (SELECT AVG(r.rating) FROM reviews r JOIN orders o ON r.order_id = o.id WHERE o.gig_id = $1), 0),
                total_reviews =
                    (SELECT COUNT(*) FROM reviews r JOIN orders o ON r.order_id = o.id WHERE o.gig_id = $1),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1;
        "#,
    )
    .bind(gig_id)
    .execute(conn)
    .await?;
    trace!("⭐️ Recomputed rating aggregates for {gig_id}");
    Ok(())
}

/// Recomputes the freelancer's rating aggregates across all their reviewed orders.
pub async fn recompute_freelancer_rating(
    freelancer_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"
            UPDATE users
            SET avg_rating = COALESCE(
                    (SELECT AVG(r.rating) FROM reviews r JOIN orders o ON r.order_id = o.id
                     WHERE o.freelancer_id = $1), 0),
                total_reviews =
                    (SELECT COUNT(*) FROM reviews r JOIN orders o ON r.order_id = o.id WHERE o.freelancer_id = $1),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1;
        "#,
    )
    .bind(freelancer_id)
    .execute(conn)
    .await?;
    trace!("⭐️ Recomputed rating aggregates for {freelancer_id}");
    Ok(())
}

pub async fn reviews_for_freelancer(
    freelancer_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Review>, sqlx::Error> {
    let reviews = sqlx::query_as(
        r#"
            SELECT r.* FROM reviews r JOIN orders o ON r.order_id = o.id
            WHERE o.freelancer_id = $1
            ORDER BY r.created_at DESC;
        "#,
    )
    .bind(freelancer_id)
    .fetch_all(conn)
    .await?;
    Ok(reviews)
}
