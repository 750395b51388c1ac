//! Status command - show identity and ledger summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use splitledger_core::domain::SnapshotSummary;
use splitledger_core::{Address, RegistrationState};

use super::{get_context, with_spinner};
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    account: Address,
    registration: RegistrationState,
    caller_name: String,
    summary: Option<SnapshotSummary>,
    warnings: Vec<String>,
}

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = &ctx.session;

    let registration = with_spinner("Loading ledger...", session.start()).await?;
    let snapshot = session.snapshot();

    let report = StatusReport {
        account: session.caller(),
        registration,
        caller_name: session.caller_name(),
        summary: snapshot.as_ref().map(|s| s.summary()),
        warnings: snapshot.map(|s| s.warnings.clone()).unwrap_or_default(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Account", report.account.as_str()]);
    table.add_row(vec!["Registration", &output::describe_registration(&report.registration)]);
    if let Some(summary) = &report.summary {
        let codec = session.codec();
        table.add_row(vec!["Expenses", &summary.expenses.to_string()]);
        table.add_row(vec!["People", &summary.people.to_string()]);
        table.add_row(vec!["Participant entries", &summary.participant_entries.to_string()]);
        table.add_row(vec![
            "Total paid",
            &format!("{} {}", codec.to_display_units(summary.total_paid), ctx.config.symbol),
        ]);
        table.add_row(vec![
            "Total owed",
            &format!("{} {}", codec.to_display_units(summary.total_owed), ctx.config.symbol),
        ]);
    }
    println!("{}", table);

    if !report.registration.is_registered() {
        println!();
        output::info("Register with 'sl register <name>' to see the shared ledger.");
    }
    for warning in &report.warnings {
        output::warning(&format!("warning: {}", warning));
    }

    Ok(())
}
