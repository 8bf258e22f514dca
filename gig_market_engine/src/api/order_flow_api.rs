use std::fmt::Debug;

use gme_common::Credits;
use log::*;

use crate::{
    db_types::{Gig, GigId, NewGig, NewOrder, NewUser, Order, OrderId, User, UserId},
    events::{EventProducers, OrderCancelledEvent, OrderCompletedEvent, OrderLateEvent},
    traits::{MarketplaceDatabase, MarketplaceError, SettlementSummary},
};

/// `OrderFlowApi` is the primary mutating API for the marketplace engine. It wraps a backend
/// implementing [`MarketplaceDatabase`], adds the input validation that does not belong in the
/// storage layer, and fires the event hooks once the backend has committed a transition.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    pub async fn register_user(&self, user: NewUser) -> Result<User, MarketplaceError> {
        self.db.register_user(user).await
    }

    pub async fn credit_user(&self, user_id: UserId, amount: Credits) -> Result<User, MarketplaceError> {
        if !amount.is_positive() {
            return Err(MarketplaceError::InvalidAmount(amount));
        }
        self.db.credit_user(user_id, amount).await
    }

    pub async fn register_gig(&self, gig: NewGig) -> Result<Gig, MarketplaceError> {
        self.db.register_gig(gig).await
    }

    /// Deletes a gig, force-cancelling its open orders. The refunds for those orders are applied
    /// on the next reconciler pass, not here.
    pub async fn delete_gig(&self, gig_id: GigId) -> Result<Vec<Order>, MarketplaceError> {
        let cancelled = self.db.delete_gig(gig_id).await?;
        self.call_order_cancelled_hook(&cancelled).await;
        info!("🔄️🗑️ {gig_id} deleted, cascading cancellation to {} open orders", cancelled.len());
        Ok(cancelled)
    }

    /// Places a new order. The client's balance must cover the gig price; the escrow debit
    /// happens atomically with the order insert.
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let order = self.db.create_order(order).await?;
        info!("🔄️📦️ {} placed by {} for {} at {}", order.id, order.client_id, order.gig_id, order.price);
        Ok(order)
    }

    pub async fn start_order(&self, order_id: OrderId, freelancer_id: UserId) -> Result<Order, MarketplaceError> {
        let order = self.db.start_order(order_id, freelancer_id).await?;
        info!("🔄️📦️ {} accepted by {}", order.id, order.freelancer_id);
        Ok(order)
    }

    pub async fn deliver_order(
        &self,
        order_id: OrderId,
        freelancer_id: UserId,
        file: &str,
        notes: &str,
    ) -> Result<Order, MarketplaceError> {
        if file.trim().is_empty() || notes.trim().is_empty() {
            return Err(MarketplaceError::DeliveryPayloadMissing(order_id));
        }
        let order = self.db.deliver_order(order_id, freelancer_id, file, notes).await?;
        info!("🔄️📦️ {} delivered; awaiting client approval", order.id);
        Ok(order)
    }

    pub async fn approve_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError> {
        let order = self.db.approve_delivery(order_id, client_id).await?;
        self.call_order_completed_hook(&order).await;
        info!("🔄️💳️ {} completed. {} released to {}", order.id, order.price, order.freelancer_id);
        Ok(order)
    }

    pub async fn reject_delivery(&self, order_id: OrderId, client_id: UserId) -> Result<Order, MarketplaceError> {
        let order = self.db.reject_delivery(order_id, client_id).await?;
        info!("🔄️📦️ Delivery on {} rejected; back in progress", order.id);
        Ok(order)
    }

    pub async fn request_cancellation(
        &self,
        order_id: OrderId,
        actor_id: UserId,
        reason: &str,
    ) -> Result<Order, MarketplaceError> {
        let order = self.db.request_cancellation(order_id, actor_id, reason).await?;
        if order.status.is_terminal() {
            // The late-client short-circuit lands here; the order went straight to cancelled.
            self.call_order_cancelled_hook(std::slice::from_ref(&order)).await;
        }
        info!("🔄️📦️ Cancellation of {} requested by {actor_id} ({})", order.id, order.status);
        Ok(order)
    }

    pub async fn approve_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError> {
        let order = self.db.approve_cancellation(order_id, actor_id).await?;
        self.call_order_cancelled_hook(std::slice::from_ref(&order)).await;
        info!("🔄️💳️ {} cancelled. {} refunded to {}", order.id, order.price, order.client_id);
        Ok(order)
    }

    pub async fn reject_cancellation(&self, order_id: OrderId, actor_id: UserId) -> Result<Order, MarketplaceError> {
        let order = self.db.reject_cancellation(order_id, actor_id).await?;
        info!("🔄️📦️ Cancellation of {} rejected; work resumes", order.id);
        Ok(order)
    }

    /// Runs one late sweep and notifies the late-order hook for each newly late order.
    pub async fn sweep_late_orders(&self) -> Result<Vec<Order>, MarketplaceError> {
        let late = self.db.sweep_late_orders().await?;
        for emitter in &self.producers.order_late_producer {
            for order in &late {
                emitter.publish_event(OrderLateEvent::new(order.clone())).await;
            }
        }
        if !late.is_empty() {
            info!("🔄️⏰️ Late sweep marked {} orders late", late.len());
        }
        Ok(late)
    }

    /// Runs one reconciliation pass over outstanding refunds and payouts.
    pub async fn reconcile_settlements(&self) -> Result<SettlementSummary, MarketplaceError> {
        let summary = self.db.reconcile_settlements().await?;
        if !summary.is_empty() {
            info!(
                "🔄️💳️ Reconciler applied {} refunds and {} payouts",
                summary.refund_count(),
                summary.payout_count()
            );
        }
        Ok(summary)
    }

    async fn call_order_completed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_completed_producer {
            debug!("🔄️📦️ Notifying order completed hook subscribers");
            emitter.publish_event(OrderCompletedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_cancelled_hook(&self, orders: &[Order]) {
        for emitter in &self.producers.order_cancelled_producer {
            debug!("🔄️📦️ Notifying order cancelled hook subscribers");
            for order in orders {
                emitter.publish_event(OrderCancelledEvent::new(order.clone())).await;
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
