//! Bounded concurrent fetches with per-task failure capture

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::result::GatewayError;
use crate::domain::Address;
use crate::ports::{GatewayResult, LedgerGateway};

/// Run `fetch` once per address with at most `limit` calls outstanding.
///
/// Results come back in input order. A failing or panicking task yields an
/// `Err` with its cause in its own slot and never cancels its siblings.
pub(crate) async fn fetch_each<T, F, Fut>(
    gateway: &Arc<dyn LedgerGateway>,
    addresses: &[Address],
    limit: usize,
    fetch: F,
) -> Vec<GatewayResult<T>>
where
    T: Send + 'static,
    F: Fn(Arc<dyn LedgerGateway>, Address) -> Fut,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (index, address) in addresses.iter().enumerate() {
        let call = fetch(Arc::clone(gateway), address.clone());
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (index, call.await)
        });
    }

    let mut slots: Vec<Option<GatewayResult<T>>> = addresses.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => tracing::warn!(error = %e, "fetch task aborted"),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(GatewayError::transport("fetch task aborted"))))
        .collect()
}
