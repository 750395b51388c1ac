//! In-process emulation of the remote ledger service
//!
//! Behaves like the deployed ledger as far as the gateway contract is
//! concerned: expense ids count up from zero, unknown people answer with the
//! zero-address sentinel, and mutations are committed before they return.
//! Faults can be injected per operation to exercise the synchronization
//! engine's degradation paths.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::domain::result::GatewayError;
use crate::domain::{Address, Amount, Person, SignedAmount};
use crate::ports::{ExpenseInfo, ExpenseReceipt, GatewayResult, LedgerGateway, Receipt};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct StoredExpense {
    label: String,
    timestamp: i64,
    entries: Vec<(Address, Amount, Amount)>,
}

impl StoredExpense {
    /// Last entry for `address` wins, like a keyed store overwritten in order
    fn amounts_of(&self, address: &Address) -> (Amount, Amount) {
        self.entries
            .iter()
            .rev()
            .find(|(a, _, _)| a == address)
            .map(|(_, paid, owed)| (*paid, *owed))
            .unwrap_or((Amount::ZERO, Amount::ZERO))
    }
}

#[derive(Default)]
struct Faults {
    expense_count: bool,
    registered_addresses: bool,
    expenses: HashSet<u64>,
    amounts: HashSet<(u64, Address)>,
    persons: HashSet<Address>,
    next_mutation: Option<GatewayError>,
}

struct LedgerState {
    expenses: Vec<StoredExpense>,
    people: Vec<Person>,
    faults: Faults,
    clock: Clock,
    latency: Duration,
    calls: u64,
}

/// Shared in-memory ledger; clones observe the same state
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                expenses: Vec::new(),
                people: Vec::new(),
                faults: Faults::default(),
                clock: Arc::new(|| Utc::now().timestamp()),
                latency: Duration::ZERO,
                calls: 0,
            })),
        }
    }

    /// A gateway acting on behalf of `caller`
    pub fn connect(&self, caller: Address) -> InMemoryGateway {
        InMemoryGateway {
            ledger: self.clone(),
            caller,
        }
    }

    /// Source of expense timestamps, in seconds since the Unix epoch
    pub fn set_clock(&self, clock: impl Fn() -> i64 + Send + Sync + 'static) {
        self.lock().clock = Arc::new(clock);
    }

    /// Delay applied to every call, for exercising overlapping requests
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Gateway calls served so far, failed ones included
    pub fn call_count(&self) -> u64 {
        self.lock().calls
    }

    pub fn expense_total(&self) -> usize {
        self.lock().expenses.len()
    }

    pub fn fail_expense_count(&self, fail: bool) {
        self.lock().faults.expense_count = fail;
    }

    /// Fail basic info and participant queries for expense `id`
    pub fn fail_expense(&self, id: u64) {
        self.lock().faults.expenses.insert(id);
    }

    /// Fail paid/owed queries for one participant of one expense
    pub fn fail_amounts(&self, id: u64, address: Address) {
        self.lock().faults.amounts.insert((id, address));
    }

    pub fn fail_person(&self, address: Address) {
        self.lock().faults.persons.insert(address);
    }

    pub fn fail_registered_addresses(&self, fail: bool) {
        self.lock().faults.registered_addresses = fail;
    }

    /// Make the next mutation fail with `error` without committing it
    pub fn fail_next_mutation(&self, error: GatewayError) {
        self.lock().faults.next_mutation = Some(error);
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and wait out the configured latency
    async fn serve(&self, operation: &str) -> MutexGuard<'_, LedgerState> {
        let latency = {
            let mut state = self.lock();
            state.calls += 1;
            state.latency
        };
        debug!(operation, "in-memory ledger call");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.lock()
    }
}

fn injected(what: impl std::fmt::Display) -> GatewayError {
    GatewayError::transport(format!("injected fault: {}", what))
}

fn expense_at(state: &LedgerState, id: u64) -> GatewayResult<&StoredExpense> {
    usize::try_from(id)
        .ok()
        .and_then(|index| state.expenses.get(index))
        .ok_or_else(|| GatewayError::rejected(format!("expense {} does not exist", id)))
}

/// Gateway bound to one caller of an [`InMemoryLedger`]
#[derive(Clone)]
pub struct InMemoryGateway {
    ledger: InMemoryLedger,
    caller: Address,
}

#[async_trait]
impl LedgerGateway for InMemoryGateway {
    fn caller(&self) -> &Address {
        &self.caller
    }

    async fn expense_count(&self) -> GatewayResult<u64> {
        let state = self.ledger.serve("expenseCount").await;
        if state.faults.expense_count {
            return Err(injected("expenseCount"));
        }
        Ok(state.expenses.len() as u64)
    }

    async fn expense_basic_info(&self, id: u64) -> GatewayResult<ExpenseInfo> {
        let state = self.ledger.serve("getExpenseBasicInfo").await;
        if state.faults.expenses.contains(&id) {
            return Err(injected(format!("expense {}", id)));
        }
        let expense = expense_at(&state, id)?;
        Ok(ExpenseInfo {
            id,
            label: expense.label.clone(),
            timestamp: expense.timestamp,
        })
    }

    async fn expense_participants(&self, id: u64) -> GatewayResult<Vec<Address>> {
        let state = self.ledger.serve("getExpenseParticipants").await;
        if state.faults.expenses.contains(&id) {
            return Err(injected(format!("expense {}", id)));
        }
        let expense = expense_at(&state, id)?;
        Ok(expense.entries.iter().map(|(a, _, _)| a.clone()).collect())
    }

    async fn amount_paid(&self, id: u64, address: &Address) -> GatewayResult<Amount> {
        let state = self.ledger.serve("getAmountPaid").await;
        if state.faults.amounts.contains(&(id, address.clone())) {
            return Err(injected(format!("amounts of {} in expense {}", address, id)));
        }
        Ok(expense_at(&state, id)?.amounts_of(address).0)
    }

    async fn amount_owed(&self, id: u64, address: &Address) -> GatewayResult<Amount> {
        let state = self.ledger.serve("getAmountOwed").await;
        if state.faults.amounts.contains(&(id, address.clone())) {
            return Err(injected(format!("amounts of {} in expense {}", address, id)));
        }
        Ok(expense_at(&state, id)?.amounts_of(address).1)
    }

    async fn registered_addresses(&self) -> GatewayResult<Vec<Address>> {
        let state = self.ledger.serve("getAllRegisteredPeople").await;
        if state.faults.registered_addresses {
            return Err(injected("getAllRegisteredPeople"));
        }
        Ok(state.people.iter().map(|p| p.address.clone()).collect())
    }

    async fn person(&self, address: &Address) -> GatewayResult<Person> {
        let state = self.ledger.serve("getPerson").await;
        if state.faults.persons.contains(address) {
            return Err(injected(format!("person {}", address)));
        }
        Ok(state
            .people
            .iter()
            .find(|p| &p.address == address)
            .cloned()
            .unwrap_or_else(Person::unregistered))
    }

    async fn net_balance(&self, address: &Address) -> GatewayResult<SignedAmount> {
        let state = self.ledger.serve("getNetBalance").await;
        Ok(state
            .expenses
            .iter()
            .flat_map(|e| &e.entries)
            .filter(|(a, _, _)| a == address)
            .map(|(_, paid, owed)| SignedAmount::net(*paid, *owed))
            .sum())
    }

    async fn caller_name(&self) -> GatewayResult<String> {
        let state = self.ledger.serve("getMyName").await;
        Ok(state
            .people
            .iter()
            .find(|p| p.address == self.caller)
            .map(|p| p.name.clone())
            .unwrap_or_default())
    }

    async fn register_person(&self, name: &str) -> GatewayResult<Receipt> {
        let mut state = self.ledger.serve("registerPerson").await;
        if let Some(error) = state.faults.next_mutation.take() {
            return Err(error);
        }
        if name.is_empty() {
            return Err(GatewayError::rejected("name cannot be empty"));
        }

        let caller = self.caller.clone();
        match state.people.iter().position(|p| p.address == caller) {
            Some(index) => state.people[index].name = name.to_string(),
            None => state.people.push(Person::new(caller, name)),
        }
        Ok(Receipt {
            reference: Some(format!("mem-register-{}", state.calls)),
        })
    }

    async fn add_expense(
        &self,
        label: &str,
        addresses: &[Address],
        paid: &[Amount],
        owed: &[Amount],
    ) -> GatewayResult<ExpenseReceipt> {
        let mut state = self.ledger.serve("addExpense").await;
        if let Some(error) = state.faults.next_mutation.take() {
            return Err(error);
        }
        if addresses.is_empty() {
            return Err(GatewayError::rejected("at least one participant required"));
        }
        if addresses.len() != paid.len() || addresses.len() != owed.len() {
            return Err(GatewayError::rejected("array lengths must match"));
        }

        let timestamp = (state.clock)();
        let entries = addresses
            .iter()
            .zip(paid.iter().zip(owed))
            .map(|(a, (p, o))| (a.clone(), *p, *o))
            .collect();
        state.expenses.push(StoredExpense {
            label: label.to_string(),
            timestamp,
            entries,
        });

        let expense_id = (state.expenses.len() - 1) as u64;
        Ok(ExpenseReceipt {
            expense_id,
            reference: Some(format!("mem-expense-{}", expense_id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u128) -> Amount {
        Amount::from_base_units(n)
    }

    #[tokio::test]
    async fn test_unknown_person_is_zero_sentinel() {
        let ledger = InMemoryLedger::new();
        let gateway = ledger.connect(Address::new("0xA"));

        let person = gateway.person(&Address::new("0xB")).await.unwrap();
        assert!(person.address.is_zero());
        assert!(person.name.is_empty());
        assert_eq!(gateway.caller_name().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_reregistration_updates_name() {
        let ledger = InMemoryLedger::new();
        let gateway = ledger.connect(Address::new("0xA"));
        gateway.register_person("Alice").await.unwrap();
        gateway.register_person("Alicia").await.unwrap();

        assert_eq!(gateway.registered_addresses().await.unwrap().len(), 1);
        assert_eq!(gateway.caller_name().await.unwrap(), "Alicia");
    }

    #[tokio::test]
    async fn test_add_expense_rules() {
        let ledger = InMemoryLedger::new();
        ledger.set_clock(|| 1_700_000_000);
        let gateway = ledger.connect(Address::new("0xA"));
        let a = Address::new("0xA");

        let err = gateway.add_expense("x", &[], &[], &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
        let err = gateway
            .add_expense("x", &[a.clone()], &[units(1)], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));

        let receipt = gateway
            .add_expense("x", &[a.clone()], &[units(1)], &[units(0)])
            .await
            .unwrap();
        assert_eq!(receipt.expense_id, 0);

        let info = gateway.expense_basic_info(0).await.unwrap();
        assert_eq!(info.timestamp, 1_700_000_000);
        assert_eq!(gateway.net_balance(&a).await.unwrap().base_units(), 1);
    }

    #[tokio::test]
    async fn test_injected_mutation_fault_is_one_shot() {
        let ledger = InMemoryLedger::new();
        let gateway = ledger.connect(Address::new("0xA"));
        ledger.fail_next_mutation(GatewayError::transport("connection reset"));

        assert!(gateway.register_person("Alice").await.is_err());
        assert!(gateway.register_person("Alice").await.is_ok());
        assert_eq!(ledger.call_count(), 2);
    }
}
