//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and gateway interactions. Each service
//! focuses on a single workflow and holds no state between calls.

mod balance;
pub(crate) mod fan_out;
mod registration;
mod single_flight;
mod submission;
mod sync;

pub use balance::{
    compute_all_balances, compute_net_balance, people_with_balances, BalanceAudit,
    BalanceDivergence, BalanceService, PersonBalance,
};
pub use registration::RegistrationService;
pub use single_flight::SingleFlight;
pub use submission::{ExpenseService, PreparedExpense};
pub use sync::{SyncService, DEFAULT_MAX_CONCURRENT_FETCHES};
