//! SplitLedger Core - client engine for a shared-expense ledger
//!
//! This crate implements the client side of a remote shared-expense ledger
//! following hexagonal architecture:
//!
//! - **domain**: Core entities (Address, Amount, Expense, Person, LedgerSnapshot)
//! - **ports**: The `LedgerGateway` trait the remote ledger is reached through
//! - **services**: Synchronization, balances, registration and submission
//! - **adapters**: Concrete gateways (JSON-RPC relay, in-memory emulation)
//! - **session**: The caller-owned live view tying the services together

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::http::HttpLedgerGateway;
use config::Config;

// Re-export commonly used types at crate root
pub use domain::result::{Error, GatewayError};
pub use domain::{
    Address, Amount, AmountCodec, Expense, ExpenseDraft, ExpenseEntry, LedgerSnapshot, Person,
    RegistrationState, SignedAmount,
};
pub use ports::LedgerGateway;
pub use session::{LedgerSession, SessionEvent, SessionOptions};

/// Main context for SplitLedger operations
///
/// Holds the resolved configuration and a session bound to the configured
/// account.
pub struct SplitLedgerContext {
    pub config: Config,
    pub session: LedgerSession,
}

impl SplitLedgerContext {
    /// Create a context talking to the configured relay
    pub fn new(dir: &Path) -> Result<Self> {
        let config = Config::load(dir)?;
        let gateway = HttpLedgerGateway::from_config(&config)
            .context("Failed to configure ledger gateway")?;
        Self::with_gateway(config, Arc::new(gateway))
    }

    /// Create a context over an already-connected gateway
    pub fn with_gateway(config: Config, gateway: Arc<dyn LedgerGateway>) -> Result<Self> {
        let options = config.session_options()?;
        Ok(Self {
            session: LedgerSession::new(gateway, options),
            config,
        })
    }
}
