//! Add command - submit a new expense

use anyhow::{bail, Context, Result};
use colored::Colorize;
use splitledger_core::ExpenseEntry;

use super::{get_context, with_spinner};
use crate::output;

/// Parse `<address>:<paid>:<owed>`
pub fn parse_participant(raw: &str) -> Result<ExpenseEntry> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(owed), Some(paid), Some(address)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected <address>:<paid>:<owed>, got '{}'", raw);
    };
    Ok(ExpenseEntry::new(address.trim(), paid.trim(), owed.trim()))
}

pub async fn run(label: String, participants: Vec<String>, json: bool) -> Result<()> {
    let entries = participants
        .iter()
        .map(|raw| parse_participant(raw))
        .collect::<Result<Vec<_>>>()?;

    let ctx = get_context()?;
    let result = with_spinner(
        "Waiting for confirmation...",
        ctx.session.submit_expense(&label, &entries),
    )
    .await;

    let expense = match result {
        Ok(expense) => expense,
        Err(e) if e.may_have_committed() => {
            output::warning("The ledger did not confirm this expense; it may still have been recorded.");
            output::warning("Run 'sl expenses' before submitting it again.");
            return Err(e).context("Expense submission unconfirmed");
        }
        Err(e) => return Err(e).context("Expense not submitted"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&expense)?);
        return Ok(());
    }

    let codec = ctx.session.codec();
    output::success(&format!("Recorded expense #{}: {}", expense.id, expense.label));
    for entry in &expense.participants {
        println!(
            "  {}  paid {}  owes {}",
            entry.address.short().dimmed(),
            codec.to_display_units(entry.amount_paid),
            codec.to_display_units(entry.amount_owed),
        );
    }
    Ok(())
}
