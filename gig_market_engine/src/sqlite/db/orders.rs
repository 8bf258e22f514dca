use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Gig, NewOrder, Order, OrderId, OrderStatusType, UserId},
    order_objects::OrderQueryFilter,
    traits::MarketplaceError,
};

/// Inserts a new order against a gig snapshot, with `pending` status and a due date of now plus
/// the gig's duration. This is not atomic on its own; callers embed it in the transaction that
/// also debits the client, passing `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, gig: &Gig, conn: &mut SqliteConnection) -> Result<Order, MarketplaceError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (gig_id, client_id, freelancer_id, price, requirements, status, due_date)
            VALUES ($1, $2, $3, $4, $5, 'pending', datetime(CURRENT_TIMESTAMP, '+' || $6 || ' days'))
            RETURNING *;
        "#,
    )
    .bind(gig.id)
    .bind(order.client_id)
    .bind(gig.freelancer_id)
    .bind(gig.price)
    .bind(order.requirements)
    .bind(gig.duration_days)
    .fetch_one(conn)
    .await?;
    debug!("📝️ {} inserted against {} for {}", order.id, order.gig_id, order.client_id);
    Ok(order)
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(gig_id) = query.gig_id {
        where_clause.push("gig_id = ");
        where_clause.push_bind_unseparated(gig_id);
    }
    if let Some(client_id) = query.client_id {
        where_clause.push("client_id = ");
        where_clause.push_bind_unseparated(client_id);
    }
    if let Some(freelancer_id) = query.freelancer_id {
        where_clause.push("freelancer_id = ");
        where_clause.push_bind_unseparated(freelancer_id);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if query.late_only {
        where_clause.push("is_late = 1");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} orders", orders.len());
    Ok(orders)
}

/// Moves an order to `new_status`, conditioned on the order currently being in one of the
/// `expected` statuses. Zero rows changed means another request transitioned the order first (or
/// it was never in an expected status); the caller reports that as an invalid transition.
pub async fn update_status_checked(
    order_id: OrderId,
    expected: &[OrderStatusType],
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let expected = expected.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
    let sql = format!(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status IN ({expected}) \
         RETURNING *;"
    );
    let order = sqlx::query_as(&sql).bind(new_status).bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Stores the delivery and moves the order to `delivered`. Legal from `in_progress` and `late`.
pub async fn deliver(
    order_id: OrderId,
    file: &str,
    notes: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'delivered', delivery_file = $1, delivery_notes = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status IN ('in_progress', 'late')
            RETURNING *;
        "#,
    )
    .bind(file)
    .bind(notes)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Records a cancellation request from one of the parties. Legal from `pending`, `in_progress`
/// and `late`; the late/client short-circuit is handled by [`force_cancel`] instead.
pub async fn request_cancellation(
    order_id: OrderId,
    actor_id: UserId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'cancellation_requested',
                cancellation_reason = $1,
                cancellation_requested_by = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status IN ('pending', 'in_progress', 'late')
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(actor_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Approves a pending cancellation request: `cancellation_requested → cancelled`.
pub async fn approve_cancellation(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'cancelled', cancellation_approved = 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'cancellation_requested'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Rejects a pending cancellation request and puts the order back in progress.
pub async fn reject_cancellation(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'in_progress', cancellation_approved = 0, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'cancellation_requested'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels an open order outright, skipping the counterpart-approval step. Used for the
/// late-order client short-circuit.
pub async fn force_cancel(
    order_id: OrderId,
    actor_id: UserId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'cancelled',
                cancellation_reason = $1,
                cancellation_requested_by = $2,
                cancellation_approved = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status IN ('pending', 'in_progress', 'late')
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(actor_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Force-cancels every open order on a gig. Completed and cancelled orders are untouched.
/// `cancellation_approved` is set so that the reconciler picks the refunds up.
pub async fn cancel_open_orders_for_gig(
    gig_id: crate::db_types::GigId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, MarketplaceError> {
    let orders = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'cancelled',
                cancellation_reason = $1,
                cancellation_approved = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE gig_id = $2 AND status IN ('pending', 'in_progress', 'cancellation_requested', 'late')
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(gig_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Marks every order past its due date as late, and flips `in_progress` orders to `late`
/// status. A single monotonic UPDATE: orders already marked late and terminal orders never
/// match the predicate, so running the sweep twice is the same as running it once.
pub async fn sweep_late(conn: &mut SqliteConnection) -> Result<Vec<Order>, MarketplaceError> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders
            SET is_late = 1,
                status = CASE WHEN status = 'in_progress' THEN 'late' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE is_late = 0 AND due_date < CURRENT_TIMESTAMP AND status NOT IN ('completed', 'cancelled')
            RETURNING *;
        "#,
    )
    .fetch_all(conn)
    .await?;
    trace!("⏰️ Late sweep marked {} orders", orders.len());
    Ok(orders)
}
