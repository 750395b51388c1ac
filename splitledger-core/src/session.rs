//! Ledger session - the caller-owned view of one identity's ledger
//!
//! A `LedgerSession` holds the live snapshot, the registration state, the
//! caller's display name and the pending expense draft. Workflows never
//! touch the snapshot directly; they trigger synchronization, which alone
//! installs replacement snapshots. Synchronization runs through a
//! single-flight guard so overlapping triggers collapse into one pass.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::result::Result;
use crate::domain::{
    Address, AmountCodec, Expense, ExpenseDraft, ExpenseEntry, LedgerSnapshot,
    RegistrationState, SignedAmount,
};
use crate::ports::LedgerGateway;
use crate::services::{
    compute_all_balances, compute_net_balance, people_with_balances, BalanceAudit,
    BalanceService, ExpenseService, PersonBalance, RegistrationService, SingleFlight,
    SyncService, DEFAULT_MAX_CONCURRENT_FETCHES,
};

type SyncOutcome = Result<Arc<LedgerSnapshot>>;

/// Session tuning
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub codec: AmountCodec,
    pub max_concurrent_fetches: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            codec: AmountCodec::ether(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Input events delivered by the signing provider or the user
pub enum SessionEvent {
    /// The signing provider switched identity; carries a gateway bound to it
    AccountChanged(Arc<dyn LedgerGateway>),
    /// User-initiated refresh
    RefreshRequested,
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountChanged(gateway) => f
                .debug_tuple("AccountChanged")
                .field(gateway.caller())
                .finish(),
            Self::RefreshRequested => f.write_str("RefreshRequested"),
        }
    }
}

/// Services bound to one gateway
struct SessionServices {
    gateway: Arc<dyn LedgerGateway>,
    sync: SyncService,
    registration: RegistrationService,
    expenses: ExpenseService,
    balances: BalanceService,
}

impl SessionServices {
    fn new(gateway: Arc<dyn LedgerGateway>, options: &SessionOptions) -> Self {
        Self {
            sync: SyncService::new(Arc::clone(&gateway))
                .with_max_concurrent_fetches(options.max_concurrent_fetches),
            registration: RegistrationService::new(Arc::clone(&gateway)),
            expenses: ExpenseService::new(Arc::clone(&gateway), options.codec),
            balances: BalanceService::new(Arc::clone(&gateway))
                .with_max_concurrent_fetches(options.max_concurrent_fetches),
            gateway,
        }
    }
}

struct SessionState {
    /// Bumped on every identity change; results from older epochs are dropped
    epoch: u64,
    services: Arc<SessionServices>,
    flight: Arc<SingleFlight<SyncOutcome>>,
    snapshot: Option<Arc<LedgerSnapshot>>,
    registration: RegistrationState,
    caller_name: String,
    draft: ExpenseDraft,
}

impl SessionState {
    fn new(epoch: u64, gateway: Arc<dyn LedgerGateway>, options: &SessionOptions) -> Self {
        Self {
            epoch,
            services: Arc::new(SessionServices::new(gateway, options)),
            flight: Arc::new(SingleFlight::new()),
            snapshot: None,
            registration: RegistrationState::Unknown,
            caller_name: String::new(),
            draft: ExpenseDraft::default(),
        }
    }
}

/// Session-scoped ledger state for one connected identity
pub struct LedgerSession {
    options: SessionOptions,
    state: RwLock<SessionState>,
}

impl LedgerSession {
    pub fn new(gateway: Arc<dyn LedgerGateway>, options: SessionOptions) -> Self {
        Self {
            state: RwLock::new(SessionState::new(0, gateway, &options)),
            options,
        }
    }

    /// Check registration and, for a registered caller, load the ledger
    pub async fn start(&self) -> Result<RegistrationState> {
        let state = self.check_registration().await?;
        if state.is_registered() {
            self.synchronize().await?;
        }
        Ok(state)
    }

    /// Query whether the connected identity is registered
    pub async fn check_registration(&self) -> Result<RegistrationState> {
        let (epoch, services) = self.current();
        let state = services
            .registration
            .check_registration(services.gateway.caller())
            .await?;

        self.update(epoch, |s| s.registration = state.clone());
        if state.is_registered() {
            self.refresh_caller_name(epoch, &services).await;
        }
        Ok(state)
    }

    /// Register the connected identity under `name`.
    ///
    /// On failure the registration state is left as it was. After a
    /// confirmed registration the ledger is re-synchronized.
    pub async fn register(&self, name: &str) -> Result<RegistrationState> {
        let (epoch, services) = self.current();
        let state = services.registration.register(name).await?;

        self.update(epoch, |s| s.registration = state.clone());
        self.refresh_caller_name(epoch, &services).await;
        self.refresh_after_commit().await;
        Ok(state)
    }

    /// Rebuild the snapshot, joining a pass that is already in flight.
    ///
    /// On `SyncFailed` the previous snapshot stays in place.
    pub async fn synchronize(&self) -> Result<Arc<LedgerSnapshot>> {
        let (epoch, services, flight) = self.current_flight();
        flight.run(|| self.sync_pass(epoch, services)).await
    }

    /// Submit a new expense and wait for the ledger to confirm it.
    ///
    /// Validation runs before any remote call. On success the draft is
    /// cleared and the ledger re-synchronized; the returned expense is the
    /// synchronized record when available.
    pub async fn submit_expense(&self, label: &str, entries: &[ExpenseEntry]) -> Result<Expense> {
        let (epoch, services) = self.current();
        let prepared = services.expenses.prepare(label, entries)?;
        let receipt = services.expenses.submit(&prepared).await?;

        self.update(epoch, |s| s.draft.clear());

        let synced = self
            .refresh_after_commit()
            .await
            .and_then(|snapshot| snapshot.expense(receipt.expense_id).cloned());
        Ok(synced.unwrap_or_else(|| prepared.to_expense(receipt.expense_id, Utc::now())))
    }

    /// Submit the pending draft; it is cleared only on success
    pub async fn submit_draft(&self) -> Result<Expense> {
        let draft = self.draft();
        self.submit_expense(&draft.label, draft.participants()).await
    }

    /// Apply an edit to the pending draft
    pub fn edit_draft<R>(&self, edit: impl FnOnce(&mut ExpenseDraft) -> R) -> R {
        edit(&mut self.write().draft)
    }

    pub fn draft(&self) -> ExpenseDraft {
        self.read().draft.clone()
    }

    /// Deliver an input event
    pub async fn handle(&self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::AccountChanged(gateway) => {
                {
                    let mut state = self.write();
                    let epoch = state.epoch + 1;
                    info!(caller = %gateway.caller(), epoch, "account changed; resetting session");
                    *state = SessionState::new(epoch, gateway, &self.options);
                }
                self.start().await.map(|_| ())
            }
            SessionEvent::RefreshRequested => self.synchronize().await.map(|_| ()),
        }
    }

    /// Compare local balances with the ledger's own figures
    pub async fn audit_balances(&self) -> Result<BalanceAudit> {
        let snapshot = match self.snapshot() {
            Some(snapshot) => snapshot,
            None => self.synchronize().await?,
        };
        let (_, services) = self.current();
        Ok(services.balances.audit(&snapshot).await)
    }

    /// Net balance of `address` in the current snapshot
    pub fn net_balance(&self, address: &Address) -> SignedAmount {
        self.snapshot()
            .map(|snapshot| compute_net_balance(&snapshot, address))
            .unwrap_or_default()
    }

    pub fn balances(&self) -> BTreeMap<Address, SignedAmount> {
        self.snapshot()
            .map(|snapshot| compute_all_balances(&snapshot))
            .unwrap_or_default()
    }

    pub fn people_with_balances(&self) -> Vec<PersonBalance> {
        self.snapshot()
            .map(|snapshot| people_with_balances(&snapshot))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<Arc<LedgerSnapshot>> {
        self.read().snapshot.clone()
    }

    pub fn registration(&self) -> RegistrationState {
        self.read().registration.clone()
    }

    pub fn caller_name(&self) -> String {
        self.read().caller_name.clone()
    }

    pub fn caller(&self) -> Address {
        self.read().services.gateway.caller().clone()
    }

    pub fn codec(&self) -> AmountCodec {
        self.options.codec
    }

    /// Synchronization passes executed for the current identity
    pub fn sync_passes(&self) -> u64 {
        self.read().flight.passes_started()
    }

    /// Re-synchronize after a committed mutation.
    ///
    /// Only a pass that starts after the commit is accepted. Failure is
    /// logged: the mutation itself already succeeded.
    async fn refresh_after_commit(&self) -> Option<Arc<LedgerSnapshot>> {
        let (epoch, services, flight) = self.current_flight();
        match flight.run_fresh(|| self.sync_pass(epoch, services)).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "refresh after commit failed; snapshot is stale");
                None
            }
        }
    }

    async fn sync_pass(&self, epoch: u64, services: Arc<SessionServices>) -> SyncOutcome {
        let snapshot = Arc::new(services.sync.synchronize().await?);
        self.update(epoch, |s| s.snapshot = Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    async fn refresh_caller_name(&self, epoch: u64, services: &SessionServices) {
        match services.registration.caller_name().await {
            Ok(name) => self.update(epoch, |s| s.caller_name = name),
            Err(e) => warn!(error = %e, "could not refresh caller name"),
        }
    }

    fn current(&self) -> (u64, Arc<SessionServices>) {
        let state = self.read();
        (state.epoch, Arc::clone(&state.services))
    }

    fn current_flight(&self) -> (u64, Arc<SessionServices>, Arc<SingleFlight<SyncOutcome>>) {
        let state = self.read();
        (state.epoch, Arc::clone(&state.services), Arc::clone(&state.flight))
    }

    /// Apply `change` unless the identity changed since `epoch`
    fn update(&self, epoch: u64, change: impl FnOnce(&mut SessionState)) {
        let mut state = self.write();
        if state.epoch == epoch {
            change(&mut state);
        } else {
            debug!(epoch, current = state.epoch, "dropping result from previous identity");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
