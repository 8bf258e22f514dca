//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. Every order transition commits as one transaction pairing the
//! status write with the balance and settlement-log writes it implies, and every status write is
//! conditioned on the expected prior status so concurrent requests on the same order are
//! serialised by the database rather than by in-process locks.
use std::fmt::Debug;

use gme_common::Credits;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, gigs, new_pool, orders, reviews, settlements, users};
use crate::{
    db_types::{
        Gig,
        GigId,
        NewGig,
        NewOrder,
        NewReview,
        NewUser,
        Order,
        OrderId,
        OrderStatusType,
        RefundLogEntry,
        Review,
        TransferLogEntry,
        User,
        UserId,
    },
    order_objects::OrderQueryFilter,
    traits::{
        LedgerError,
        LedgerManagement,
        MarketplaceDatabase,
        MarketplaceError,
        ReviewManagement,
        SettlementSummary,
    },
};

pub const GIG_DELETED_REASON: &str = "The gig was deleted by the freelancer";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    // Even single-statement mutations go through an explicit transaction: sqlx's SQLite worker
    // commits autocommit statements asynchronously, and only an explicit COMMIT guarantees that
    // the next operation on another pool connection sees the row.
    async fn register_user(&self, user: NewUser) -> Result<User, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} registered as {} with balance {}", user.id, user.role, user.balance);
        Ok(user)
    }

    async fn credit_user(&self, user_id: UserId, amount: Credits) -> Result<User, MarketplaceError> {
        if !amount.is_positive() {
            return Err(MarketplaceError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        let user = users::credit(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} topped up with {amount}", user.id);
        Ok(user)
    }

    async fn register_gig(&self, gig: NewGig) -> Result<Gig, MarketplaceError> {
        if !gig.price.is_positive() {
            return Err(MarketplaceError::InvalidAmount(gig.price));
        }
        let mut tx = self.pool.begin().await?;
        let freelancer_id = gig.freelancer_id;
        let owner = users::fetch_user(freelancer_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::UserNotFound(freelancer_id))?;
        let gig = gigs::insert_gig(gig, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} registered by {} at {}", gig.id, owner.id, gig.price);
        Ok(gig)
    }

    /// Force-cancels the gig's open orders, then removes the gig row, in one transaction. The
    /// refund credits are deliberately left to the reconciler, so a failure here can never leave
    /// a half-refunded order behind.
    async fn delete_gig(&self, gig_id: GigId) -> Result<Vec<Order>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        gigs::fetch_gig(gig_id, &mut tx).await?.ok_or(MarketplaceError::GigNotFound(gig_id))?;
        let cancelled = orders::cancel_open_orders_for_gig(gig_id, GIG_DELETED_REASON, &mut tx).await?;
        gigs::delete_gig_row(gig_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {gig_id} deleted. {} open orders force-cancelled", cancelled.len());
        Ok(cancelled)
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let gig = gigs::fetch_gig(order.gig_id, &mut tx).await?.ok_or(MarketplaceError::GigNotFound(order.gig_id))?;
        let client_id = order.client_id;
        // The debit carries the sufficient-funds check; a None here is either a missing client
        // or a balance that cannot cover the price.
        if users::debit(client_id, gig.price, &mut tx).await?.is_none() {
            let err = match users::fetch_user(client_id, &mut tx).await? {
                Some(_) => MarketplaceError::InsufficientFunds(client_id, gig.price),
                None => MarketplaceError::UserNotFound(client_id),
            };
            tx.rollback().await?;
            return Err(err);
        }
        let order = orders::insert_order(order, &gig, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} created: {} escrowed from {}, due {}", order.id, order.price, order.client_id, order.due_date);
        Ok(order)
    }

    async fn start_order(&self, order_id: OrderId, freelancer_id: UserId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.freelancer_id != freelancer_id {
            return Err(MarketplaceError::Forbidden(format!("{freelancer_id} is not the freelancer on {order_id}")));
        }
        let order = orders::update_status_checked(
            order_id,
            &[OrderStatusType::Pending],
            OrderStatusType::InProgress,
            &mut tx,
        )
        .await?
        .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "start"))?;
        tx.commit().await?;
        debug!("🗃️ {} started by {}", order.id, order.freelancer_id);
        Ok(order)
    }

    async fn deliver_order(
        &self,
        order_id: OrderId,
        freelancer_id: UserId,
        file: &str,
        notes: &str,
    ) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.freelancer_id != freelancer_id {
            return Err(MarketplaceError::Forbidden(format!("{freelancer_id} is not the freelancer on {order_id}")));
        }
        let order = orders::deliver(order_id, file, notes, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "deliver"))?;
        tx.commit().await?;
        debug!("🗃️ {} delivered by {}", order.id, order.freelancer_id);
        Ok(order)
    }

    /// `delivered → completed`, with the payout credit and its transfer log entry in the same
    /// transaction. The log insert is the idempotence gate: the credit is only applied when the
    /// insert lands, so a payout can never be applied twice even if the reconciler races us.
    async fn approve_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.client_id != client_id {
            return Err(MarketplaceError::Forbidden(format!("{client_id} is not the client on {order_id}")));
        }
        let order = orders::update_status_checked(
            order_id,
            &[OrderStatusType::Delivered],
            OrderStatusType::Completed,
            &mut tx,
        )
        .await?
        .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "approve delivery on"))?;
        let settled =
            settlements::insert_transfer_log(order.id, order.price, order.client_id, order.freelancer_id, &mut tx)
                .await?;
        if settled {
            users::credit(order.freelancer_id, order.price, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {} completed. {} released to {}", order.id, order.price, order.freelancer_id);
        Ok(order)
    }

    async fn reject_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.client_id != client_id {
            return Err(MarketplaceError::Forbidden(format!("{client_id} is not the client on {order_id}")));
        }
        let order = orders::update_status_checked(
            order_id,
            &[OrderStatusType::Delivered],
            OrderStatusType::InProgress,
            &mut tx,
        )
        .await?
        .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "reject delivery on"))?;
        tx.commit().await?;
        debug!("🗃️ {} delivery rejected; re-opened for redelivery", order.id);
        Ok(order)
    }

    async fn request_cancellation(
        &self,
        order_id: OrderId,
        actor_id: UserId,
        reason: &str,
    ) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if !order.is_party(actor_id) {
            return Err(MarketplaceError::Forbidden(format!("{actor_id} is not a party to {order_id}")));
        }
        // A client cancelling a late order is never held hostage by the freelancer: the request
        // is auto-approved and the refund applied in the same transaction. A freelancer request
        // on a late order follows the normal counterpart-approval path.
        if order.is_late && actor_id == order.client_id {
            let order = orders::force_cancel(order_id, actor_id, reason, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "cancel"))?;
            let settled = settlements::insert_refund_log(order.id, order.price, &mut tx).await?;
            if settled {
                users::credit(order.client_id, order.price, &mut tx).await?;
            }
            tx.commit().await?;
            debug!("🗃️ {} was late; cancellation auto-approved and {} refunded to {}",
                order.id, order.price, order.client_id);
            return Ok(order);
        }
        let order = orders::request_cancellation(order_id, actor_id, reason, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "request cancellation of"))?;
        tx.commit().await?;
        debug!("🗃️ Cancellation of {} requested by {actor_id}", order.id);
        Ok(order)
    }

    async fn approve_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if !order.is_party(actor_id) {
            return Err(MarketplaceError::Forbidden(format!("{actor_id} is not a party to {order_id}")));
        }
        if order.cancellation_requested_by == Some(actor_id) {
            return Err(MarketplaceError::Forbidden(format!(
                "{actor_id} requested the cancellation of {order_id} and cannot approve it"
            )));
        }
        let order = orders::approve_cancellation(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "approve cancellation of"))?;
        let settled = settlements::insert_refund_log(order.id, order.price, &mut tx).await?;
        if settled {
            users::credit(order.client_id, order.price, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {} cancelled. {} refunded to {}", order.id, order.price, order.client_id);
        Ok(order)
    }

    async fn reject_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if !order.is_party(actor_id) {
            return Err(MarketplaceError::Forbidden(format!("{actor_id} is not a party to {order_id}")));
        }
        if order.cancellation_requested_by == Some(actor_id) {
            return Err(MarketplaceError::Forbidden(format!(
                "{actor_id} requested the cancellation of {order_id} and cannot reject it"
            )));
        }
        let order = orders::reject_cancellation(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::invalid_transition(order.status, "reject cancellation of"))?;
        tx.commit().await?;
        debug!("🗃️ Cancellation of {} rejected; work resumes", order.id);
        Ok(order)
    }

    async fn sweep_late_orders(&self) -> Result<Vec<Order>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let late = orders::sweep_late(&mut tx).await?;
        tx.commit().await?;
        if !late.is_empty() {
            debug!("🗃️ Late sweep: {} orders newly marked late", late.len());
        }
        Ok(late)
    }

    /// Each outstanding settlement is applied in its own transaction, gated on its log insert
    /// landing. Two reconcilers (or a reconciler racing the inline settlement path) cannot both
    /// win the insert, so each order's money moves exactly once.
    async fn reconcile_settlements(&self) -> Result<SettlementSummary, MarketplaceError> {
        let mut summary = SettlementSummary::default();
        let outstanding_refunds = {
            let mut conn = self.pool.acquire().await?;
            settlements::refunds_outstanding(&mut conn).await?
        };
        for order in outstanding_refunds {
            let mut tx = self.pool.begin().await?;
            if settlements::insert_refund_log(order.id, order.price, &mut tx).await? {
                users::credit(order.client_id, order.price, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Reconciler refunded {} to {} for {}", order.price, order.client_id, order.id);
                summary.refunded.push(order.id);
            } else {
                tx.rollback().await?;
            }
        }
        let outstanding_payouts = {
            let mut conn = self.pool.acquire().await?;
            settlements::payouts_outstanding(&mut conn).await?
        };
        for order in outstanding_payouts {
            let mut tx = self.pool.begin().await?;
            if settlements::insert_transfer_log(order.id, order.price, order.client_id, order.freelancer_id, &mut tx)
                .await?
            {
                users::credit(order.freelancer_id, order.price, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Reconciler paid out {} to {} for {}", order.price, order.freelancer_id, order.id);
                summary.paid_out.push(order.id);
            } else {
                tx.rollback().await?;
            }
        }
        Ok(summary)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_gig(&self, gig_id: GigId) -> Result<Option<Gig>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let gig = gigs::fetch_gig(gig_id, &mut conn).await?;
        Ok(gig)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let orders = sqlx::query_as(
            "SELECT * FROM orders WHERE client_id = $1 OR freelancer_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(orders)
    }

    async fn fetch_refund_log(&self, order_id: OrderId) -> Result<Option<RefundLogEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let entry = settlements::fetch_refund_log(order_id, &mut conn).await?;
        Ok(entry)
    }

    async fn fetch_transfer_log(&self, order_id: OrderId) -> Result<Option<TransferLogEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let entry = settlements::fetch_transfer_log(order_id, &mut conn).await?;
        Ok(entry)
    }
}

impl ReviewManagement for SqliteDatabase {
    async fn create_review(&self, review: NewReview, author: UserId) -> Result<Review, MarketplaceError> {
        if !(1..=5).contains(&review.rating) {
            return Err(MarketplaceError::InvalidRating(review.rating));
        }
        let mut tx = self.pool.begin().await?;
        let order_id = review.order_id;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.client_id != author {
            return Err(MarketplaceError::Forbidden(format!("{author} is not the client on {order_id}")));
        }
        if order.status != OrderStatusType::Completed {
            return Err(MarketplaceError::OrderNotCompleted(order_id));
        }
        let review = reviews::insert_review(review, &mut tx).await?;
        reviews::recompute_gig_rating(order.gig_id, &mut tx).await?;
        reviews::recompute_freelancer_rating(order.freelancer_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Review {} ({}⭐️) added for {}", review.id, review.rating, order_id);
        Ok(review)
    }

    async fn fetch_reviews_for_freelancer(&self, freelancer_id: UserId) -> Result<Vec<Review>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let reviews = reviews::reviews_for_freelancer(freelancer_id, &mut conn).await?;
        Ok(reviews)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
