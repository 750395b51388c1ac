//! Demo command - scripted walkthrough against an in-memory ledger

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use splitledger_core::adapters::memory::InMemoryLedger;
use splitledger_core::domain::DraftField;
use splitledger_core::{Address, ExpenseEntry, LedgerSession, SessionEvent, SessionOptions};

use crate::output;

const ALICE: &str = "0x1111111111111111111111111111111111111111";
const BOB: &str = "0x2222222222222222222222222222222222222222";
const CAROL: &str = "0x3333333333333333333333333333333333333333";
const FRACTION_DIGITS: u32 = 5;

pub async fn run() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let session = LedgerSession::new(
        Arc::new(ledger.connect(Address::new(ALICE))),
        SessionOptions::default(),
    );

    println!("{}", "SplitLedger demo (in-memory ledger)".bold());
    println!();

    let state = session.start().await?;
    output::info(&format!("Alice connects: {}", output::describe_registration(&state)));
    session.register("Alice").await?;
    output::success("Alice registered");

    for (address, name) in [(BOB, "Bob"), (CAROL, "Carol")] {
        let other = LedgerSession::new(
            Arc::new(ledger.connect(Address::new(address))),
            SessionOptions::default(),
        );
        other.register(name).await?;
        output::success(&format!("{} registered", name));
    }

    session
        .submit_expense(
            "Dinner",
            &[
                ExpenseEntry::new(ALICE, "30.0", "10.0"),
                ExpenseEntry::new(BOB, "0", "10.0"),
                ExpenseEntry::new(CAROL, "0", "10.0"),
            ],
        )
        .await?;
    output::success("Alice paid 30.0 for dinner, split three ways");

    let bob = Arc::new(ledger.connect(Address::new(BOB)));
    session.handle(SessionEvent::AccountChanged(bob)).await?;
    output::info(&format!("Switched to {}", session.caller_name()));

    session.edit_draft(|draft| {
        draft.set_label("Taxi");
        draft.update_participant(0, DraftField::Address, BOB);
        draft.update_participant(0, DraftField::AmountPaid, "12.5");
        draft.update_participant(0, DraftField::AmountOwed, "6.25");
        let row = draft.add_participant();
        draft.update_participant(row, DraftField::Address, ALICE);
        draft.update_participant(row, DraftField::AmountOwed, "6.25");
    });
    session.submit_draft().await?;
    output::success("Bob paid 12.5 for a taxi shared with Alice");
    println!();

    let Some(snapshot) = session.snapshot() else {
        output::warning("No snapshot available");
        return Ok(());
    };

    let codec = session.codec();
    let mut table = output::create_table();
    table.set_header(vec!["Name", "Address", "Net balance (ETH)"]);
    for row in session.people_with_balances() {
        table.add_row(vec![
            Cell::new(&row.person.name),
            Cell::new(row.person.address.short()),
            output::balance_cell(&codec, row.balance, FRACTION_DIGITS),
        ]);
    }
    println!("{}", table);

    let summary = snapshot.summary();
    println!(
        "{} expenses, {} participant entries, {} ETH paid in total",
        summary.expenses,
        summary.participant_entries,
        codec.to_display_units(summary.total_paid)
    );

    let audit = session.audit_balances().await?;
    if audit.is_consistent() {
        output::success("Local balances match the ledger");
    } else {
        output::warning(&format!("{} balances diverge from the ledger", audit.divergences.len()));
    }
    Ok(())
}
