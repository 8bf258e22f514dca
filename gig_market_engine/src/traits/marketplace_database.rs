use gme_common::Credits;
use thiserror::Error;

use crate::{
    db_types::{Gig, GigId, NewGig, NewOrder, NewUser, Order, OrderId, OrderStatusType, User, UserId},
    traits::{LedgerError, LedgerManagement, SettlementSummary},
};

/// This trait defines the highest level of behaviour for backends supporting the marketplace
/// engine: the order state machine, its escrow effects on the balance ledger, and the two
/// recurring sweeps.
///
/// Implementations must guarantee that
/// * a status change and the balance mutation it justifies commit as one transaction, and
/// * concurrent transitions on the same order are serialised by conditioning each status write
///   on the expected prior status; a write that matches zero rows is reported as
///   [`MarketplaceError::InvalidTransition`].
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + LedgerManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Registers a new user with the given opening balance.
    async fn register_user(&self, user: NewUser) -> Result<User, MarketplaceError>;

    /// Credits a user's balance outside the order flow (an account top-up). Returns the updated
    /// user record.
    async fn credit_user(&self, user_id: UserId, amount: Credits) -> Result<User, MarketplaceError>;

    /// Registers a new gig owned by a freelancer.
    async fn register_gig(&self, gig: NewGig) -> Result<Gig, MarketplaceError>;

    /// Deletes a gig. Before the gig row is removed, every one of its open orders (pending,
    /// in progress, cancellation requested or late) is force-cancelled with
    /// `cancellation_approved` set, so the reconciler will refund the clients. Completed and
    /// cancelled orders are untouched. Returns the cancelled orders.
    async fn delete_gig(&self, gig_id: GigId) -> Result<Vec<Order>, MarketplaceError>;

    /// Creates an order for a gig on behalf of a client. In a single transaction, the gig's
    /// price is debited from the client's balance into escrow and the order is inserted with
    /// `pending` status and a due date of now plus the gig's duration.
    async fn create_order(&self, order: NewOrder) -> Result<Order, MarketplaceError>;

    /// The freelancer accepts a pending order and starts work: `pending → in_progress`.
    async fn start_order(&self, order_id: OrderId, freelancer_id: UserId) -> Result<Order, MarketplaceError>;

    /// The freelancer delivers: `in_progress | late → delivered`, storing the delivery file
    /// reference and notes.
    async fn deliver_order(
        &self,
        order_id: OrderId,
        freelancer_id: UserId,
        file: &str,
        notes: &str,
    ) -> Result<Order, MarketplaceError>;

    /// The client approves the delivery: `delivered → completed`. The escrowed price is credited
    /// to the freelancer and the transfer log entry is written in the same transaction.
    async fn approve_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError>;

    /// The client rejects the delivery and re-opens the order: `delivered → in_progress`.
    async fn reject_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError>;

    /// Either party asks to cancel an open order. Normally this moves the order to
    /// `cancellation_requested`, to be approved or rejected by the counterpart. If the order is
    /// late and the requester is the client, the request is auto-approved: the order goes
    /// straight to `cancelled` and the refund is applied in the same transaction.
    async fn request_cancellation(
        &self,
        order_id: OrderId,
        actor_id: UserId,
        reason: &str,
    ) -> Result<Order, MarketplaceError>;

    /// The counterpart of the requester approves the cancellation:
    /// `cancellation_requested → cancelled`, with the refund credited to the client and the
    /// refund log entry written in the same transaction.
    async fn approve_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError>;

    /// The counterpart of the requester rejects the cancellation and work resumes:
    /// `cancellation_requested → in_progress`.
    async fn reject_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError>;

    /// Marks every order past its due date as late, and moves in-progress orders to `late`
    /// status. Monotonic and idempotent: orders already marked late, and terminal orders, are
    /// never touched. Returns the orders that were newly marked late in this sweep.
    async fn sweep_late_orders(&self) -> Result<Vec<Order>, MarketplaceError>;

    /// Applies every outstanding settlement exactly once: refunds for cancelled-and-approved
    /// orders with no refund log entry, and payouts for completed orders with no transfer log
    /// entry. Each settlement pairs its credit with the log insert in one transaction keyed on
    /// the log's unique order id, so the pass is safe to run repeatedly and concurrently with
    /// itself.
    async fn reconcile_settlements(&self) -> Result<SettlementSummary, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(UserId),
    #[error("The requested gig {0} does not exist")]
    GigNotFound(GigId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0} cannot cover {1}")]
    InsufficientFunds(UserId, Credits),
    #[error("{0} is not a valid amount for this operation")]
    InvalidAmount(Credits),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Cannot {event} an order in status '{from}'")]
    InvalidTransition { from: OrderStatusType, event: String },
    #[error("A delivery needs both a file reference and notes")]
    DeliveryPayloadMissing(OrderId),
    #[error("A review already exists for {0}")]
    ReviewAlreadyExists(OrderId),
    #[error("{0} is not completed, so it cannot be reviewed")]
    OrderNotCompleted(OrderId),
    #[error("Rating {0} is out of range; ratings run from 1 to 5")]
    InvalidRating(i64),
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
}

impl MarketplaceError {
    pub fn invalid_transition(from: OrderStatusType, event: &str) -> Self {
        MarketplaceError::InvalidTransition { from, event: event.to_string() }
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
