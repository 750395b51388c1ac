//! Balance service - net positions derived from a snapshot

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::domain::{Address, LedgerSnapshot, Person, SignedAmount};
use crate::ports::LedgerGateway;
use crate::services::fan_out::fetch_each;
use crate::services::sync::DEFAULT_MAX_CONCURRENT_FETCHES;

/// Net balance of `address`: sum of paid - owed over every entry naming it.
///
/// Addresses that never appear have a balance of zero.
pub fn compute_net_balance(snapshot: &LedgerSnapshot, address: &Address) -> SignedAmount {
    snapshot
        .expenses
        .iter()
        .flat_map(|e| e.entries_for(address))
        .map(|entry| entry.net())
        .sum()
}

/// Net balance for every registered person and every participant address
pub fn compute_all_balances(snapshot: &LedgerSnapshot) -> BTreeMap<Address, SignedAmount> {
    let mut balances: BTreeMap<Address, SignedAmount> = snapshot
        .people
        .iter()
        .map(|p| (p.address.clone(), SignedAmount::ZERO))
        .collect();

    for entry in snapshot.expenses.iter().flat_map(|e| &e.participants) {
        *balances.entry(entry.address.clone()).or_default() += entry.net();
    }
    balances
}

/// One row of the people table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonBalance {
    pub person: Person,
    pub balance: SignedAmount,
}

/// People in registration order with their net balance
pub fn people_with_balances(snapshot: &LedgerSnapshot) -> Vec<PersonBalance> {
    let balances = compute_all_balances(snapshot);
    snapshot
        .people
        .iter()
        .map(|person| PersonBalance {
            balance: balances.get(&person.address).copied().unwrap_or_default(),
            person: person.clone(),
        })
        .collect()
}

/// Local and remote net balances disagree for `address`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDivergence {
    pub address: Address,
    pub local: SignedAmount,
    pub remote: SignedAmount,
}

/// Result of comparing client-side balances against the ledger's own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceAudit {
    pub checked: usize,
    pub divergences: Vec<BalanceDivergence>,
    /// Addresses whose remote balance could not be fetched
    pub unavailable: Vec<Address>,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty() && self.unavailable.is_empty()
    }
}

/// Balance service for remote consistency checks
pub struct BalanceService {
    gateway: Arc<dyn LedgerGateway>,
    max_concurrent_fetches: usize,
}

impl BalanceService {
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

    /// Compare each person's locally computed balance with the ledger's.
    ///
    /// Neither side is treated as authoritative; divergences are reported
    /// as data-integrity signals.
    pub async fn audit(&self, snapshot: &LedgerSnapshot) -> BalanceAudit {
        let addresses: Vec<Address> = snapshot.people.iter().map(|p| p.address.clone()).collect();
        let remote = fetch_each(
            &self.gateway,
            &addresses,
            self.max_concurrent_fetches,
            |gateway, address| async move { gateway.net_balance(&address).await },
        )
        .await;

        let local = compute_all_balances(snapshot);
        let mut audit = BalanceAudit {
            checked: addresses.len(),
            ..BalanceAudit::default()
        };

        for (address, outcome) in addresses.into_iter().zip(remote) {
            let local = local.get(&address).copied().unwrap_or_default();
            match outcome {
                Ok(remote) if remote == local => {}
                Ok(remote) => {
                    warn!(address = %address, local = %local, remote = %remote, "net balance divergence");
                    audit.divergences.push(BalanceDivergence {
                        address,
                        local,
                        remote,
                    });
                }
                Err(cause) => {
                    warn!(address = %address, error = %cause, "remote net balance unavailable");
                    audit.unavailable.push(address);
                }
            }
        }
        audit
    }
}
