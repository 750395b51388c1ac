//! Remote ledger gateway port
//!
//! Defines the query/mutation surface of the authoritative ledger service.
//! The gateway is bound to one caller identity, supplied by the signing
//! provider that constructed it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::amount::deserialize_integer;
use crate::domain::result::GatewayError;
use crate::domain::{Address, Amount, Person, SignedAmount};

/// Gateway call result
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Basic fields of an expense record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseInfo {
    #[serde(deserialize_with = "deserialize_integer")]
    pub id: u64,
    pub label: String,
    /// Seconds since the Unix epoch
    #[serde(deserialize_with = "deserialize_integer")]
    pub timestamp: i64,
}

/// Confirmation of a committed mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transport-specific reference, e.g. a transaction hash
    pub reference: Option<String>,
}

/// Confirmation of a committed `addExpense`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseReceipt {
    pub expense_id: u64,
    pub reference: Option<String>,
}

/// Ledger gateway trait
///
/// Mutations return only once the ledger has durably committed the change;
/// an `Err` from a mutation means the change is not confirmed.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Identity every call is made on behalf of
    fn caller(&self) -> &Address;

    /// Total number of expense records
    async fn expense_count(&self) -> GatewayResult<u64>;

    async fn expense_basic_info(&self, id: u64) -> GatewayResult<ExpenseInfo>;

    /// Participant addresses in participant order
    async fn expense_participants(&self, id: u64) -> GatewayResult<Vec<Address>>;

    async fn amount_paid(&self, id: u64, address: &Address) -> GatewayResult<Amount>;

    async fn amount_owed(&self, id: u64, address: &Address) -> GatewayResult<Amount>;

    async fn registered_addresses(&self) -> GatewayResult<Vec<Address>>;

    /// Person record; unknown addresses yield the zero-address sentinel
    async fn person(&self, address: &Address) -> GatewayResult<Person>;

    /// The ledger's own net balance for `address`
    async fn net_balance(&self, address: &Address) -> GatewayResult<SignedAmount>;

    /// Registered name of the caller (empty when unregistered)
    async fn caller_name(&self) -> GatewayResult<String>;

    async fn register_person(&self, name: &str) -> GatewayResult<Receipt>;

    /// The three slices must have equal length
    async fn add_expense(
        &self,
        label: &str,
        addresses: &[Address],
        paid: &[Amount],
        owed: &[Amount],
    ) -> GatewayResult<ExpenseReceipt>;
}
