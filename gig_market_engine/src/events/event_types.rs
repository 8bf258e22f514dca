use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Fired when a delivery is approved and the escrowed funds are released to the freelancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired when an order reaches `cancelled`, whether by mutual agreement, a late-order
/// short-circuit, or a gig deletion cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired for each order the sweeper newly marks late.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLateEvent {
    pub order: Order,
}

impl OrderLateEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
