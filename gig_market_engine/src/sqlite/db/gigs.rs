use sqlx::SqliteConnection;

use crate::{
    db_types::{Gig, GigId, NewGig},
    traits::MarketplaceError,
};

pub async fn insert_gig(gig: NewGig, conn: &mut SqliteConnection) -> Result<Gig, MarketplaceError> {
    let gig = sqlx::query_as(
        r#"
            INSERT INTO gigs (title, description, price, category, duration_days, freelancer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(gig.title)
    .bind(gig.description)
    .bind(gig.price)
    .bind(gig.category)
    .bind(gig.duration_days)
    .bind(gig.freelancer_id)
    .fetch_one(conn)
    .await?;
    Ok(gig)
}

pub async fn fetch_gig(gig_id: GigId, conn: &mut SqliteConnection) -> Result<Option<Gig>, sqlx::Error> {
    let gig = sqlx::query_as("SELECT * FROM gigs WHERE id = $1").bind(gig_id).fetch_optional(conn).await?;
    Ok(gig)
}

/// Removes the gig row itself. The cascade over its open orders must already have run in the
/// same transaction; this function does not touch orders.
pub async fn delete_gig_row(gig_id: GigId, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let result = sqlx::query("DELETE FROM gigs WHERE id = $1").bind(gig_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::GigNotFound(gig_id));
    }
    Ok(())
}
