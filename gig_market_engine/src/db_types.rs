use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use gme_common::Credits;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const DEFAULT_GIG_DURATION_DAYS: i64 = 7;

//--------------------------------------       UserId        ---------------------------------------------------------
/// A lightweight wrapper around the integer id of a row in the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------        GigId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct GigId(pub i64);

impl Display for GigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gig#{}", self.0)
    }
}

impl From<i64> for GigId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Freelancer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Freelancer => write!(f, "freelancer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "freelancer" => Ok(Self::Freelancer),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
/// The set of states an order can occupy. `Completed` and `Cancelled` are terminal; once an
/// order reaches either, nothing (sweeper and reconciler included) may move it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been created and paid into escrow, but the freelancer has not started work.
    Pending,
    /// The freelancer has accepted the order and is working on it.
    InProgress,
    /// The freelancer has delivered; the client must approve or reject.
    Delivered,
    /// The client approved the delivery. Escrow has been released to the freelancer.
    Completed,
    /// The order was cancelled. Escrow is (or will be) returned to the client.
    Cancelled,
    /// One party has asked to cancel; the counterpart must approve or reject.
    CancellationRequested,
    /// The order was in progress when its due date passed.
    Late,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::InProgress => "in_progress",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Completed => "completed",
            OrderStatusType::Cancelled => "cancelled",
            OrderStatusType::CancellationRequested => "cancellation_requested",
            OrderStatusType::Late => "late",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "cancellation_requested" => Ok(Self::CancellationRequested),
            "late" => Ok(Self::Late),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// The user's spendable balance. Mutated only by ledger operations.
    pub balance: Credits,
    /// Derived review aggregate, recomputed from the full review set. Only meaningful for
    /// freelancers.
    pub avg_rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub balance: Credits,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S, email: S, role: Role) -> Self {
        Self { name: name.into(), email: email.into(), role, balance: Credits::zero() }
    }

    pub fn with_balance(mut self, balance: Credits) -> Self {
        self.balance = balance;
        self
    }
}

//--------------------------------------         Gig         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Gig {
    pub id: GigId,
    pub title: String,
    pub description: String,
    /// Price in credits, copied onto each order at creation time. Changing it later does not
    /// affect existing orders.
    pub price: Credits,
    pub category: String,
    /// Derived review aggregate, recomputed from the full review set.
    pub rating: f64,
    pub total_reviews: i64,
    pub duration_days: i64,
    pub freelancer_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGig {
    pub title: String,
    pub description: String,
    pub price: Credits,
    pub category: String,
    pub duration_days: i64,
    pub freelancer_id: UserId,
}

impl NewGig {
    pub fn new<S: Into<String>>(title: S, price: Credits, freelancer_id: UserId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            price,
            category: String::new(),
            duration_days: DEFAULT_GIG_DURATION_DAYS,
            freelancer_id,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_duration_days(mut self, days: i64) -> Self {
        self.duration_days = days;
        self
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub gig_id: GigId,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    /// The escrowed amount. Debited from the client at creation and held until the order reaches
    /// a terminal state.
    pub price: Credits,
    pub requirements: String,
    pub status: OrderStatusType,
    pub due_date: DateTime<Utc>,
    /// Monotonic: once an order has been late, it stays marked late.
    pub is_late: bool,
    pub delivery_file: Option<String>,
    pub delivery_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_by: Option<UserId>,
    pub cancellation_approved: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the given user is the client or freelancer on this order.
    pub fn is_party(&self, user_id: UserId) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }

    /// The other party to the order. Returns `None` if the user is not a party at all.
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.client_id {
            Some(self.freelancer_id)
        } else if user_id == self.freelancer_id {
            Some(self.client_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub gig_id: GigId,
    pub client_id: UserId,
    pub requirements: String,
}

impl NewOrder {
    pub fn new<S: Into<String>>(gig_id: GigId, client_id: UserId, requirements: S) -> Self {
        Self { gig_id, client_id, requirements: requirements.into() }
    }
}

//--------------------------------------       Review        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub order_id: OrderId,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub order_id: OrderId,
    pub rating: i64,
    pub comment: Option<String>,
}

impl NewReview {
    pub fn new(order_id: OrderId, rating: i64) -> Self {
        Self { order_id, rating, comment: None }
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

//--------------------------------------   Settlement logs   ---------------------------------------------------------
/// Append-only record of a refund applied to a cancelled order. At most one row per order id;
/// the uniqueness constraint is the deduplication mechanism for the reconciler.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefundLogEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Credits,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a payout applied to a completed order. At most one row per order id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TransferLogEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Credits,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        let all = [
            OrderStatusType::Pending,
            OrderStatusType::InProgress,
            OrderStatusType::Delivered,
            OrderStatusType::Completed,
            OrderStatusType::Cancelled,
            OrderStatusType::CancellationRequested,
            OrderStatusType::Late,
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("paused".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(OrderStatusType::Completed.is_terminal());
        assert!(OrderStatusType::Cancelled.is_terminal());
        assert!(!OrderStatusType::Late.is_terminal());
        assert!(!OrderStatusType::CancellationRequested.is_terminal());
    }

    #[test]
    fn counterpart_resolution() {
        let now = Utc::now();
        let order = Order {
            id: OrderId(1),
            gig_id: GigId(1),
            client_id: UserId(10),
            freelancer_id: UserId(20),
            price: Credits::from(100),
            requirements: "logo".into(),
            status: OrderStatusType::Pending,
            due_date: now,
            is_late: false,
            delivery_file: None,
            delivery_notes: None,
            cancellation_reason: None,
            cancellation_requested_by: None,
            cancellation_approved: None,
            created_at: now,
            updated_at: now,
        };
        assert!(order.is_party(UserId(10)));
        assert!(!order.is_party(UserId(30)));
        assert_eq!(order.counterpart_of(UserId(10)), Some(UserId(20)));
        assert_eq!(order.counterpart_of(UserId(20)), Some(UserId(10)));
        assert_eq!(order.counterpart_of(UserId(30)), None);
    }
}
