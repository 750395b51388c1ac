//! Adapter implementations
//!
//! Adapters implement the `LedgerGateway` port:
//! - JSON-RPC relay client for the deployed ledger
//! - In-memory ledger emulation for tests and demos

pub mod http;
pub mod memory;

#[cfg(test)]
pub mod relay_mock;
