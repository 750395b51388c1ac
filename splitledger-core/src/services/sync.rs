//! Sync service - rebuild a ledger snapshot from the remote ledger

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Expense, LedgerSnapshot, ParticipantEntry, Person};
use crate::ports::LedgerGateway;
use crate::services::fan_out::fetch_each;

/// Default cap on outstanding per-participant / per-person requests
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Synchronization engine
///
/// Stateless between calls: every `synchronize` enumerates the ledger from
/// scratch and returns a fresh snapshot. Past the expense count query the
/// pass is best-effort; per-item failures degrade only the affected item
/// and are recorded in `LedgerSnapshot::warnings`.
pub struct SyncService {
    gateway: Arc<dyn LedgerGateway>,
    max_concurrent_fetches: usize,
}

impl SyncService {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            gateway,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Build a new snapshot
    ///
    /// Fails with `SyncFailed` only when the expense count query fails.
    pub async fn synchronize(&self) -> Result<LedgerSnapshot> {
        let count = self.gateway.expense_count().await.map_err(|e| {
            warn!(error = %e, "expense count query failed; keeping previous snapshot");
            Error::SyncFailed(e)
        })?;
        info!(count, "synchronizing ledger");

        let mut warnings = Vec::new();

        // Sequential on purpose: deterministic id order, and one bad record
        // cannot disturb the ones after it.
        let mut expenses = Vec::new();
        for id in 0..count {
            if let Some(expense) = self.load_expense(id, &mut warnings).await {
                expenses.push(expense);
            }
        }

        let people = self.load_people(&mut warnings).await;

        info!(
            expenses = expenses.len(),
            people = people.len(),
            warnings = warnings.len(),
            "ledger synchronized"
        );
        Ok(LedgerSnapshot::new(expenses, people, warnings))
    }

    async fn load_expense(&self, id: u64, warnings: &mut Vec<String>) -> Option<Expense> {
        let header = tokio::try_join!(
            self.gateway.expense_basic_info(id),
            self.gateway.expense_participants(id),
        );
        let (info, addresses) = match header {
            Ok(header) => header,
            Err(e) => {
                warn!(expense_id = id, error = %e, "skipping expense");
                warnings.push(format!("expense {} skipped: {}", id, e));
                return None;
            }
        };

        let Some(timestamp) = DateTime::<Utc>::from_timestamp(info.timestamp, 0) else {
            warn!(expense_id = id, timestamp = info.timestamp, "skipping expense with invalid timestamp");
            warnings.push(format!("expense {} skipped: invalid timestamp {}", id, info.timestamp));
            return None;
        };

        let amounts = fetch_each(
            &self.gateway,
            &addresses,
            self.max_concurrent_fetches,
            move |gateway, address| async move {
                tokio::try_join!(
                    gateway.amount_paid(id, &address),
                    gateway.amount_owed(id, &address),
                )
            },
        )
        .await;

        let participants = addresses
            .into_iter()
            .zip(amounts)
            .map(|(address, outcome)| match outcome {
                Ok((paid, owed)) => ParticipantEntry::new(address, paid, owed),
                Err(cause) => {
                    warn!(expense_id = id, address = %address, error = %cause, "zeroing participant amounts");
                    warnings.push(format!(
                        "expense {} participant {} zeroed: {}",
                        id, address, cause
                    ));
                    ParticipantEntry::zeroed(address)
                }
            })
            .collect();

        debug!(expense_id = id, label = %info.label, "expense loaded");
        Some(Expense {
            id: info.id,
            label: info.label,
            timestamp,
            participants,
        })
    }

    async fn load_people(&self, warnings: &mut Vec<String>) -> Vec<Person> {
        let addresses = match self.gateway.registered_addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!(error = %e, "registered address query failed; people omitted");
                warnings.push(format!("people omitted: {}", e));
                return Vec::new();
            }
        };

        let records = fetch_each(
            &self.gateway,
            &addresses,
            self.max_concurrent_fetches,
            |gateway, address| async move { gateway.person(&address).await },
        )
        .await;

        addresses
            .iter()
            .zip(records)
            .filter_map(|(address, outcome)| match outcome {
                Ok(person) if person.is_registrant() => Some(person),
                Ok(_) => {
                    debug!(address = %address, "registered address has no person record");
                    None
                }
                Err(cause) => {
                    warn!(address = %address, error = %cause, "omitting person");
                    warnings.push(format!("person {} omitted: {}", address, cause));
                    None
                }
            })
            .collect()
    }
}
