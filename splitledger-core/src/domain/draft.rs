//! Pending expense form state

use serde::{Deserialize, Serialize};

use super::ExpenseEntry;

/// Which field of a draft participant to edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Address,
    AmountPaid,
    AmountOwed,
}

/// An expense being composed; always holds at least one participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub label: String,
    participants: Vec<ExpenseEntry>,
}

impl Default for ExpenseDraft {
    fn default() -> Self {
        Self {
            label: String::new(),
            participants: vec![ExpenseEntry::default()],
        }
    }
}

impl ExpenseDraft {
    pub fn participants(&self) -> &[ExpenseEntry] {
        &self.participants
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Append an empty participant row and return its index
    pub fn add_participant(&mut self) -> usize {
        self.participants.push(ExpenseEntry::default());
        self.participants.len() - 1
    }

    /// Returns false when `index` is out of range
    pub fn update_participant(&mut self, index: usize, field: DraftField, value: impl Into<String>) -> bool {
        let Some(entry) = self.participants.get_mut(index) else {
            return false;
        };
        let value = value.into();
        match field {
            DraftField::Address => entry.address = value,
            DraftField::AmountPaid => entry.amount_paid = value,
            DraftField::AmountOwed => entry.amount_owed = value,
        }
        true
    }

    /// Remove a row; the last remaining row is never removed
    pub fn remove_participant(&mut self, index: usize) -> bool {
        if self.participants.len() <= 1 || index >= self.participants.len() {
            return false;
        }
        self.participants.remove(index);
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
