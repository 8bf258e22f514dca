use thiserror::Error;

use crate::{
    db_types::{Gig, GigId, Order, OrderId, RefundLogEntry, TransferLogEntry, User, UserId},
    order_objects::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// Read-side queries over users, gigs, orders and the settlement logs. Nothing here mutates
/// state; use [`super::MarketplaceDatabase`] for that.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Fetches the user with the given id, or `None` if no such user exists.
    async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, LedgerError>;

    /// Fetches the gig with the given id, or `None` if no such gig exists.
    async fn fetch_gig(&self, gig_id: GigId) -> Result<Option<Gig>, LedgerError>;

    /// Fetches the order with the given id, or `None` if no such order exists.
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, LedgerError>;

    /// Fetches orders according to the criteria in the given filter, ordered by creation time.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError>;

    /// Fetches every order on which the given user is a party, as client or freelancer.
    async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, LedgerError>;

    /// Fetches the refund log entry for an order, if its refund has been applied.
    async fn fetch_refund_log(&self, order_id: OrderId) -> Result<Option<RefundLogEntry>, LedgerError>;

    /// Fetches the transfer log entry for an order, if its payout has been applied.
    async fn fetch_transfer_log(&self, order_id: OrderId) -> Result<Option<TransferLogEntry>, LedgerError>;
}
