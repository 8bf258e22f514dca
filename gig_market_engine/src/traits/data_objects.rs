use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

/// The outcome of a reconciliation pass: which orders had their refund applied, and which had
/// their payout applied, in this pass. Orders settled in earlier passes do not appear again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub refunded: Vec<OrderId>,
    pub paid_out: Vec<OrderId>,
}

impl SettlementSummary {
    pub fn refund_count(&self) -> usize {
        self.refunded.len()
    }

    pub fn payout_count(&self) -> usize {
        self.paid_out.len()
    }

    pub fn total_count(&self) -> usize {
        self.refunded.len() + self.paid_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refunded.is_empty() && self.paid_out.is_empty()
    }
}
