mod ledger_api;
mod order_flow_api;
mod review_api;

pub use ledger_api::LedgerApi;
pub use order_flow_api::OrderFlowApi;
pub use review_api::ReviewApi;
