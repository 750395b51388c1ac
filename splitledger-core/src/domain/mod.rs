//! Core domain entities
//!
//! All ledger entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod address;
pub mod amount;
mod draft;
mod expense;
mod person;
pub mod result;
mod snapshot;

pub use address::{Address, ZERO_ADDRESS};
pub use amount::{Amount, AmountCodec, SignedAmount};
pub use draft::{DraftField, ExpenseDraft};
pub use expense::{Expense, ExpenseEntry, ParticipantEntry};
pub use person::{Person, RegistrationState};
pub use snapshot::{LedgerSnapshot, SnapshotSummary};
