use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{GigId, OrderId, OrderStatusType, UserId},
    traits::LedgerError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub gig_id: Option<GigId>,
    pub client_id: Option<UserId>,
    pub freelancer_id: Option<UserId>,
    pub status: Option<Vec<OrderStatusType>>,
    pub late_only: bool,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_gig_id(mut self, gig_id: GigId) -> Self {
        self.gig_id = Some(gig_id);
        self
    }

    pub fn with_client_id(mut self, client_id: UserId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_freelancer_id(mut self, freelancer_id: UserId) -> Self {
        self.freelancer_id = Some(freelancer_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn late_only(mut self) -> Self {
        self.late_only = true;
        self
    }

    pub fn since<T>(mut self, since: T) -> Result<Self, LedgerError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| LedgerError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, LedgerError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| LedgerError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.gig_id.is_none()
            && self.client_id.is_none()
            && self.freelancer_id.is_none()
            && self.status.is_none()
            && !self.late_only
            && self.since.is_none()
            && self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(id) = self.order_id {
            write!(f, "order: {id}. ")?;
        }
        if let Some(id) = self.gig_id {
            write!(f, "gig: {id}. ")?;
        }
        if let Some(id) = self.client_id {
            write!(f, "client: {id}. ")?;
        }
        if let Some(id) = self.freelancer_id {
            write!(f, "freelancer: {id}. ")?;
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("|");
            write!(f, "status: {s}. ")?;
        }
        if self.late_only {
            write!(f, "late only. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}
