//! Result and error types for the core library

use thiserror::Error;

/// Failure reported by a ledger gateway call
///
/// `Transport` and `Unconfirmed` leave the outcome of a mutation unknown:
/// the remote ledger may or may not have committed it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by ledger: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("not confirmed: {0}")]
    Unconfirmed(String),
}

impl GatewayError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether a mutation that failed this way might still have been committed
    pub fn may_have_committed(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unconfirmed(_))
    }
}

/// Core library error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A local precondition failed; nothing was sent to the ledger
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A mutation was attempted and was rejected or never confirmed
    #[error("Remote error in {operation}: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    /// A read-only query failed; the ledger state is unchanged
    #[error("Query failed in {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    /// The expense count query failed before any ledger data was read
    #[error("Sync failed: {0}")]
    SyncFailed(#[source] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid amount error
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    /// Create a remote error for a named gateway operation
    pub fn remote(operation: &'static str, source: GatewayError) -> Self {
        Self::Remote { operation, source }
    }

    /// Create a query error for a named read-only gateway operation
    pub fn query(operation: &'static str, source: GatewayError) -> Self {
        Self::Query { operation, source }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the ledger may hold a change the caller has not seen confirmed.
    ///
    /// Validation failures never reach the ledger and queries never mutate it,
    /// so both always return false.
    pub fn may_have_committed(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.may_have_committed(),
            _ => false,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
