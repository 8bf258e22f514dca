use gme_common::Credits;

use crate::{
    db_types::{Gig, GigId, Order, OrderId, RefundLogEntry, TransferLogEntry, User, UserId},
    order_objects::OrderQueryFilter,
    traits::{LedgerError, LedgerManagement, MarketplaceError},
};

/// The `LedgerApi` is the read-side surface of the engine: balances, orders and the settlement
/// logs. It never mutates anything.
#[derive(Debug, Clone)]
pub struct LedgerApi<B> {
    db: B,
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub async fn user(&self, user_id: UserId) -> Result<User, MarketplaceError> {
        self.db.fetch_user(user_id).await?.ok_or(MarketplaceError::UserNotFound(user_id))
    }

    pub async fn balance(&self, user_id: UserId) -> Result<Credits, MarketplaceError> {
        Ok(self.user(user_id).await?.balance)
    }

    pub async fn gig(&self, gig_id: GigId) -> Result<Gig, MarketplaceError> {
        self.db.fetch_gig(gig_id).await?.ok_or(MarketplaceError::GigNotFound(gig_id))
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))
    }

    /// Searches orders with an arbitrary combination of filters.
    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        self.db.search_orders(query).await
    }

    /// All orders the user is a party to, as client or freelancer, oldest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, LedgerError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn refund_log(&self, order_id: OrderId) -> Result<Option<RefundLogEntry>, LedgerError> {
        self.db.fetch_refund_log(order_id).await
    }

    pub async fn transfer_log(&self, order_id: OrderId) -> Result<Option<TransferLogEntry>, LedgerError> {
        self.db.fetch_transfer_log(order_id).await
    }
}
