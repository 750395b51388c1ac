//! Expense domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, Amount, SignedAmount};

/// One participant's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub address: Address,
    pub amount_paid: Amount,
    pub amount_owed: Amount,
}

impl ParticipantEntry {
    pub fn new(address: Address, amount_paid: Amount, amount_owed: Amount) -> Self {
        Self {
            address,
            amount_paid,
            amount_owed,
        }
    }

    /// Placeholder used when a participant's amounts could not be fetched
    pub fn zeroed(address: Address) -> Self {
        Self::new(address, Amount::ZERO, Amount::ZERO)
    }

    /// paid - owed
    pub fn net(&self) -> SignedAmount {
        SignedAmount::net(self.amount_paid, self.amount_owed)
    }
}

/// An immutable ledger record; ids are assigned by the ledger in ascending order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<ParticipantEntry>,
}

impl Expense {
    /// Entries for `address`, in participant order (duplicates are possible)
    pub fn entries_for<'a>(
        &'a self,
        address: &'a Address,
    ) -> impl Iterator<Item = &'a ParticipantEntry> + 'a {
        self.participants.iter().filter(move |p| &p.address == address)
    }

    pub fn total_paid(&self) -> Amount {
        self.participants
            .iter()
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.amount_paid))
    }

    pub fn total_owed(&self) -> Amount {
        self.participants
            .iter()
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.amount_owed))
    }
}

/// A proposed participant as entered by the user, amounts still in display units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub address: String,
    pub amount_paid: String,
    pub amount_owed: String,
}

impl ExpenseEntry {
    pub fn new(
        address: impl Into<String>,
        amount_paid: impl Into<String>,
        amount_owed: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            amount_paid: amount_paid.into(),
            amount_owed: amount_owed.into(),
        }
    }
}

impl Default for ExpenseEntry {
    fn default() -> Self {
        Self::new("", "0", "0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_net() {
        let entry = ParticipantEntry::new(
            Address::new("0xA"),
            Amount::from_base_units(10),
            Amount::from_base_units(4),
        );
        assert_eq!(entry.net().base_units(), 6);
        assert!(ParticipantEntry::zeroed(Address::new("0xB")).net().is_zero());
    }

    #[test]
    fn test_expense_totals() {
        let expense = Expense {
            id: 0,
            label: "Dinner".into(),
            timestamp: Utc::now(),
            participants: vec![
                ParticipantEntry::new("0xA".into(), Amount::from_base_units(10), Amount::from_base_units(5)),
                ParticipantEntry::new("0xB".into(), Amount::ZERO, Amount::from_base_units(5)),
            ],
        };
        assert_eq!(expense.total_paid().base_units(), 10);
        assert_eq!(expense.total_owed().base_units(), 10);
        assert_eq!(expense.entries_for(&Address::new("0xB")).count(), 1);
    }
}
