//! Audit command - compare local balances with the ledger's own

use anyhow::{Context, Result};
use comfy_table::Cell;

use super::{get_context, load_registered, with_spinner};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = &ctx.session;

    if load_registered(&ctx).await?.is_none() {
        return Ok(());
    }
    let audit = with_spinner("Auditing balances...", session.audit_balances())
        .await
        .context("Balance audit failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
        return Ok(());
    }

    if audit.is_consistent() {
        output::success(&format!("All {} balances match the ledger.", audit.checked));
        return Ok(());
    }

    let codec = session.codec();
    let digits = ctx.config.fraction_digits;
    if !audit.divergences.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Address", "Local", "Ledger"]);
        for divergence in &audit.divergences {
            table.add_row(vec![
                Cell::new(divergence.address.as_str()),
                output::balance_cell(&codec, divergence.local, digits),
                output::balance_cell(&codec, divergence.remote, digits),
            ]);
        }
        output::warning(&format!(
            "{} of {} balances diverge from the ledger:",
            audit.divergences.len(),
            audit.checked
        ));
        println!("{}", table);
    }
    for address in &audit.unavailable {
        output::warning(&format!("Ledger balance unavailable for {}", address));
    }
    Ok(())
}
