//! Background workers for the two recurring sweeps.
//!
//! Late marking and settlement reconciliation never run on the request path; each gets its own
//! interval-driven task over a clone of the backend.
use std::time::Duration;

use log::*;
use tokio::task::JoinHandle;

use crate::{api::OrderFlowApi, db_types::Order, events::EventProducers, SqliteDatabase};

/// Starts the late-order sweeper. Do not await the returned JoinHandle, as it runs indefinitely.
pub fn start_sweeper_worker(db: SqliteDatabase, producers: EventProducers, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Late-order sweeper started (every {period:?})");
        loop {
            timer.tick().await;
            trace!("🕰️ Running late-order sweep");
            match api.sweep_late_orders().await {
                Ok(late) => {
                    if !late.is_empty() {
                        info!("🕰️ {} orders newly marked late: {}", late.len(), order_list(&late));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running late-order sweep: {e}");
                },
            }
        }
    })
}

/// Starts the settlement reconciler. Do not await the returned JoinHandle, as it runs
/// indefinitely.
pub fn start_reconciler_worker(db: SqliteDatabase, producers: EventProducers, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Settlement reconciler started (every {period:?})");
        loop {
            timer.tick().await;
            trace!("🕰️ Running settlement reconciliation");
            match api.reconcile_settlements().await {
                Ok(summary) => {
                    if !summary.is_empty() {
                        info!(
                            "🕰️ Reconciler applied {} refunds and {} payouts",
                            summary.refund_count(),
                            summary.payout_count()
                        );
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running settlement reconciliation: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("{} (gig {}, due {})", o.id, o.gig_id, o.due_date))
        .collect::<Vec<String>>()
        .join(", ")
}
