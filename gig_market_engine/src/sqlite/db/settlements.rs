use gme_common::Credits;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderId, RefundLogEntry, TransferLogEntry, UserId},
    traits::MarketplaceError,
};

/// Inserts the refund log entry for an order if none exists yet. Returns `true` if this call
/// created the entry — i.e. the caller now owns applying the refund credit — and `false` if the
/// refund was already logged by an earlier pass. The unique constraint on `order_id` makes this
/// the sole arbiter; there is no separate existence check to race against.
pub async fn insert_refund_log(
    order_id: OrderId,
    amount: Credits,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let result = sqlx::query("INSERT OR IGNORE INTO refund_log (order_id, amount) VALUES ($1, $2)")
        .bind(order_id)
        .bind(amount)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts the transfer log entry for an order if none exists yet. Same contract as
/// [`insert_refund_log`], for payouts.
pub async fn insert_transfer_log(
    order_id: OrderId,
    amount: Credits,
    from: UserId,
    to: UserId,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO transfer_log (order_id, amount, from_user_id, to_user_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(amount)
    .bind(from)
    .bind(to)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_refund_log(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<RefundLogEntry>, sqlx::Error> {
    let entry =
        sqlx::query_as("SELECT * FROM refund_log WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(entry)
}

pub async fn fetch_transfer_log(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TransferLogEntry>, sqlx::Error> {
    let entry =
        sqlx::query_as("SELECT * FROM transfer_log WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(entry)
}

/// Cancelled-and-approved orders whose refund has not been applied yet.
pub async fn refunds_outstanding(conn: &mut SqliteConnection) -> Result<Vec<Order>, MarketplaceError> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders o
            WHERE o.status = 'cancelled'
              AND o.cancellation_approved = 1
              AND NOT EXISTS (SELECT 1 FROM refund_log WHERE order_id = o.id)
            ORDER BY o.created_at ASC;
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Completed orders whose payout has not been applied yet.
pub async fn payouts_outstanding(conn: &mut SqliteConnection) -> Result<Vec<Order>, MarketplaceError> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders o
            WHERE o.status = 'completed'
              AND NOT EXISTS (SELECT 1 FROM transfer_log WHERE order_id = o.id)
            ORDER BY o.created_at ASC;
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
