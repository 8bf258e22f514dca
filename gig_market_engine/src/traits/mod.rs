//! # Backend contracts
//!
//! This module defines the interface contracts of the marketplace engine database *backends*.
//!
//! ## Escrow
//! Every order carries its gig's price in escrow: the amount is debited from the client when the
//! order is created, and is released exactly once — to the freelancer on completion, or back to
//! the client on cancellation. The backend is responsible for making each transition and its
//! balance effect a single atomic unit, and for serialising concurrent transitions on the same
//! order with status-conditioned updates.
//!
//! ## Traits
//! * [`MarketplaceDatabase`] defines the mutating order/escrow flow, the late-order sweep and
//!   the settlement reconciler.
//! * [`LedgerManagement`] provides read-side queries for users, gigs, orders and the settlement
//!   logs.
//! * [`ReviewManagement`] handles post-completion reviews and their derived rating aggregates.
mod data_objects;
mod ledger_management;
mod marketplace_database;
mod review_management;

pub use data_objects::SettlementSummary;
pub use ledger_management::{LedgerError, LedgerManagement};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use review_management::ReviewManagement;
