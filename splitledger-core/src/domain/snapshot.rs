//! Point-in-time reconstruction of the remote ledger

use std::collections::HashSet;

use serde::Serialize;

use super::{Address, Amount, Expense, Person};

/// Complete, immutable view of the ledger produced by one synchronization
///
/// Expenses are in ascending id order. People are unique by address and
/// keep the ledger's registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub expenses: Vec<Expense>,
    pub people: Vec<Person>,
    /// Per-item fetch failures absorbed while building this snapshot
    pub warnings: Vec<String>,
}

impl LedgerSnapshot {
    pub fn new(expenses: Vec<Expense>, people: Vec<Person>, warnings: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let people = people
            .into_iter()
            .filter(|p| seen.insert(p.address.clone()))
            .collect();
        Self {
            expenses,
            people,
            warnings,
        }
    }

    pub fn person(&self, address: &Address) -> Option<&Person> {
        self.people.iter().find(|p| &p.address == address)
    }

    pub fn expense(&self, id: u64) -> Option<&Expense> {
        self.expenses
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| &self.expenses[index])
    }

    /// Registered name, or the truncated address for unknown participants
    pub fn display_name(&self, address: &Address) -> String {
        match self.person(address) {
            Some(person) if !person.name.is_empty() => person.name.clone(),
            _ => address.short(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            expenses: self.expenses.len(),
            people: self.people.len(),
            participant_entries: self.expenses.iter().map(|e| e.participants.len()).sum(),
            total_paid: self
                .expenses
                .iter()
                .fold(Amount::ZERO, |acc, e| acc.saturating_add(e.total_paid())),
            total_owed: self
                .expenses
                .iter()
                .fold(Amount::ZERO, |acc, e| acc.saturating_add(e.total_owed())),
            warnings: self.warnings.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub expenses: usize,
    pub people: usize,
    pub participant_entries: usize,
    pub total_paid: Amount,
    pub total_owed: Amount,
    pub warnings: usize,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::ParticipantEntry;

    fn expense(id: u64, entries: Vec<ParticipantEntry>) -> Expense {
        Expense {
            id,
            label: format!("expense {}", id),
            timestamp: Utc::now(),
            participants: entries,
        }
    }

    #[test]
    fn test_people_deduplicated_in_order() {
        let snapshot = LedgerSnapshot::new(
            Vec::new(),
            vec![
                Person::new("0xB", "Bob"),
                Person::new("0xA", "Alice"),
                Person::new("0xB", "Bobby"),
            ],
            Vec::new(),
        );
        let names: Vec<_> = snapshot.people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice"]);
    }

    #[test]
    fn test_display_name_fallback() {
        let snapshot = LedgerSnapshot::new(Vec::new(), vec![Person::new("0xA", "Alice")], Vec::new());
        assert_eq!(snapshot.display_name(&Address::new("0xA")), "Alice");
        assert_eq!(
            snapshot.display_name(&Address::new("0x1234567890abcdef")),
            "0x123456..."
        );
    }

    #[test]
    fn test_expense_lookup_and_summary() {
        let entry = |addr: &str, paid: u128| {
            ParticipantEntry::new(
                Address::new(addr),
                Amount::from_base_units(paid),
                Amount::from_base_units(1),
            )
        };
        let snapshot = LedgerSnapshot::new(
            vec![
                expense(0, vec![entry("0xA", 5)]),
                expense(2, vec![entry("0xA", 1), entry("0xB", 2)]),
            ],
            Vec::new(),
            vec!["expense 1 skipped".into()],
        );

        assert_eq!(snapshot.expense(2).map(|e| e.participants.len()), Some(2));
        assert!(snapshot.expense(1).is_none());
        assert!(!snapshot.is_complete());

        let summary = snapshot.summary();
        assert_eq!(summary.expenses, 2);
        assert_eq!(summary.participant_entries, 3);
        assert_eq!(summary.total_paid.base_units(), 8);
        assert_eq!(summary.total_owed.base_units(), 3);
        assert_eq!(summary.warnings, 1);
    }
}
