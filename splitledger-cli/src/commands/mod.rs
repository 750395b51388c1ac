//! CLI command implementations

pub mod add;
pub mod audit;
pub mod demo;
pub mod expenses;
pub mod people;
pub mod register;
pub mod setup;
pub mod status;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use splitledger_core::config::Config;
use splitledger_core::{LedgerSnapshot, SplitLedgerContext};

use crate::output;

/// Get the splitledger directory from environment or default
pub fn get_splitledger_dir() -> Result<PathBuf> {
    Config::default_dir()
}

/// Get or create splitledger context
pub fn get_context() -> Result<SplitLedgerContext> {
    let dir = get_splitledger_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create splitledger directory: {:?}", dir))?;

    SplitLedgerContext::new(&dir).context("Failed to initialize splitledger context")
}

/// Await `work` behind a spinner
pub async fn with_spinner<T>(msg: &str, work: impl Future<Output = T>) -> T {
    let bar = output::spinner(msg);
    let result = work.await;
    bar.finish_and_clear();
    result
}

/// Check registration and load the ledger for a registered caller.
///
/// Prints a hint and returns `None` when the caller is not registered.
pub async fn load_registered(ctx: &SplitLedgerContext) -> Result<Option<Arc<LedgerSnapshot>>> {
    let state = with_spinner("Loading ledger...", ctx.session.start())
        .await
        .context("Failed to load ledger")?;
    if !state.is_registered() {
        output::warning(&format!(
            "Account {} is not registered. Run 'sl register <name>' first.",
            ctx.session.caller()
        ));
        return Ok(None);
    }
    Ok(ctx.session.snapshot())
}
