//! Request coalescing for synchronization passes

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Default)]
struct Passes {
    started: u64,
    in_flight: bool,
}

/// Serializes passes and lets concurrent callers share one outcome
///
/// Passes never overlap. [`SingleFlight::run`] joins a pass that is already
/// in flight; [`SingleFlight::run_fresh`] only accepts the outcome of a pass
/// that started after the call, so it always observes changes committed
/// before it was invoked.
#[derive(Debug)]
pub struct SingleFlight<T> {
    passes: Mutex<Passes>,
    last: AsyncMutex<Option<(u64, T)>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            passes: Mutex::new(Passes::default()),
            last: AsyncMutex::new(None),
        }
    }

    /// Run `work`, or share the outcome of the pass currently in flight
    pub async fn run<F, Fut>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = {
            let passes = self.lock_passes();
            if passes.in_flight {
                passes.started - 1
            } else {
                passes.started
            }
        };
        self.run_from(ticket, work).await
    }

    /// Run `work`, or share the outcome of a pass that started after this call
    pub async fn run_fresh<F, Fut>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.lock_passes().started;
        self.run_from(ticket, work).await
    }

    /// Number of passes actually executed
    pub fn passes_started(&self) -> u64 {
        self.lock_passes().started
    }

    async fn run_from<F, Fut>(&self, ticket: u64, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last.lock().await;
        if let Some((pass, outcome)) = last.as_ref() {
            if *pass >= ticket {
                tracing::debug!(pass, "sharing synchronization pass");
                return outcome.clone();
            }
        }

        let pass = {
            let mut passes = self.lock_passes();
            passes.in_flight = true;
            passes.started += 1;
            passes.started - 1
        };

        let outcome = work().await;
        *last = Some((pass, outcome.clone()));
        self.lock_passes().in_flight = false;
        outcome
    }

    fn lock_passes(&self) -> std::sync::MutexGuard<'_, Passes> {
        self.passes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
