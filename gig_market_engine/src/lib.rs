//! Gig Marketplace Engine
//!
//! The order lifecycle and escrow ledger engine for a two-sided freelance marketplace. A client
//! buys a gig; the gig's price is debited from the client's balance and held in escrow until the
//! order reaches a terminal state: `completed` pays the freelancer, `cancelled` refunds the
//! client. Exactly one of those settlements happens per order, ever.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly. Instead, use the public API. The
//!    exception is the data types used in the database, defined in [`mod@db_types`].
//! 2. The engine's public API ([`mod@api`]). [`OrderFlowApi`] drives every order state
//!    transition and the two background sweeps, [`LedgerApi`] serves read-side queries, and
//!    [`ReviewApi`] handles post-completion reviews. Backends implement the traits in
//!    [`mod@traits`] to plug in under these APIs.
//! 3. Background workers ([`mod@workers`]): a late-order sweeper and a settlement reconciler,
//!    each an interval-driven task. The request path never runs sweeps itself.
//!
//! The engine also emits events when orders complete, get cancelled, or go late. A small actor
//! framework in [`mod@events`] lets you hook into these and perform custom actions.
pub mod api;
pub mod db_types;
pub mod events;
pub mod order_objects;
pub mod sqlite;
pub mod test_utils;
pub mod traits;
pub mod workers;

pub use api::{LedgerApi, OrderFlowApi, ReviewApi};
pub use sqlite::SqliteDatabase;
pub use traits::{LedgerManagement, MarketplaceDatabase, MarketplaceError, ReviewManagement};
