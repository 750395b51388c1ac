//! Expense service - validate, convert and submit new expenses

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Address, Amount, AmountCodec, Expense, ExpenseEntry, ParticipantEntry};
use crate::ports::{ExpenseReceipt, LedgerGateway};

/// An expense that passed local validation, amounts already in base units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedExpense {
    pub label: String,
    pub addresses: Vec<Address>,
    pub paid: Vec<Amount>,
    pub owed: Vec<Amount>,
}

impl PreparedExpense {
    pub fn participants(&self) -> Vec<ParticipantEntry> {
        self.addresses
            .iter()
            .zip(self.paid.iter().zip(&self.owed))
            .map(|(address, (paid, owed))| ParticipantEntry::new(address.clone(), *paid, *owed))
            .collect()
    }

    /// The expense as the ledger will hold it once committed under `id`
    pub fn to_expense(&self, id: u64, timestamp: DateTime<Utc>) -> Expense {
        Expense {
            id,
            label: self.label.clone(),
            timestamp,
            participants: self.participants(),
        }
    }
}

/// Expense service for the submission workflow
pub struct ExpenseService {
    gateway: Arc<dyn LedgerGateway>,
    codec: AmountCodec,
}

impl ExpenseService {
    pub fn new(gateway: Arc<dyn LedgerGateway>, codec: AmountCodec) -> Self {
        Self { gateway, codec }
    }

    /// Validate raw form input and convert amounts to base units.
    ///
    /// Purely local. The first violated rule is reported. The label is kept
    /// as typed; only its emptiness is judged after trimming.
    pub fn prepare(&self, label: &str, entries: &[ExpenseEntry]) -> Result<PreparedExpense> {
        if label.trim().is_empty() {
            return Err(Error::validation("missing label"));
        }
        if entries.is_empty() {
            return Err(Error::validation("no participants"));
        }
        if entries.iter().any(|entry| {
            entry.address.trim().is_empty()
                || is_negative(&entry.amount_paid)
                || is_negative(&entry.amount_owed)
        }) {
            return Err(Error::validation("invalid participant"));
        }

        let mut prepared = PreparedExpense {
            label: label.to_string(),
            addresses: Vec::with_capacity(entries.len()),
            paid: Vec::with_capacity(entries.len()),
            owed: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            let address = Address::new(entry.address.as_str());
            prepared.paid.push(self.convert(&address, &entry.amount_paid)?);
            prepared.owed.push(self.convert(&address, &entry.amount_owed)?);
            prepared.addresses.push(address);
        }

        let mut seen = HashSet::new();
        for address in &prepared.addresses {
            if !seen.insert(address) {
                warn!(label = %prepared.label, address = %address, "participant address repeats within expense");
            }
        }
        Ok(prepared)
    }

    /// Submit a prepared expense and wait for the ledger to confirm it
    pub async fn submit(&self, expense: &PreparedExpense) -> Result<ExpenseReceipt> {
        let receipt = self
            .gateway
            .add_expense(&expense.label, &expense.addresses, &expense.paid, &expense.owed)
            .await
            .map_err(|e| {
                warn!(label = %expense.label, error = %e, "expense not confirmed");
                Error::remote("addExpense", e)
            })?;

        info!(
            expense_id = receipt.expense_id,
            label = %expense.label,
            participants = expense.addresses.len(),
            "expense committed"
        );
        Ok(receipt)
    }

    fn convert(&self, address: &Address, raw: &str) -> Result<Amount> {
        self.codec.to_base_units(raw).map_err(|e| match e {
            Error::InvalidAmount(reason) => {
                Error::validation(format!("invalid amount for {}: {}", address, reason))
            }
            other => other,
        })
    }
}

fn is_negative(raw: &str) -> bool {
    Decimal::from_str(raw.trim())
        .map(|value| value < Decimal::ZERO)
        .unwrap_or(false)
}
