//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod ledger_gateway;

pub use ledger_gateway::{ExpenseInfo, ExpenseReceipt, GatewayResult, LedgerGateway, Receipt};
