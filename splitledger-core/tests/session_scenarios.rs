//! End-to-end workflow scenarios against the in-memory ledger
//!
//! Each test drives a `LedgerSession` the way a presentation layer would:
//! start, register, submit, refresh, and read balances back.
//!
//! Run with: cargo test --test session_scenarios

use std::sync::Arc;

use splitledger_core::adapters::memory::InMemoryLedger;
use splitledger_core::domain::{Address, Amount, ExpenseEntry, RegistrationState, SignedAmount};
use splitledger_core::{Error, GatewayError, LedgerGateway, LedgerSession, SessionEvent, SessionOptions};

const ETHER: u128 = 1_000_000_000_000_000_000;

fn session(ledger: &InMemoryLedger, caller: &str) -> LedgerSession {
    LedgerSession::new(
        Arc::new(ledger.connect(Address::new(caller))),
        SessionOptions::default(),
    )
}

fn dinner() -> Vec<ExpenseEntry> {
    vec![
        ExpenseEntry::new("0xA", "10.0", "5.0"),
        ExpenseEntry::new("0xB", "0", "5.0"),
    ]
}

#[tokio::test]
async fn registration_scenario() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");

    assert_eq!(session.check_registration().await.unwrap(), RegistrationState::NotRegistered);

    let state = session.register("Alice").await.unwrap();
    assert_eq!(state, RegistrationState::Registered("Alice".into()));
    assert_eq!(
        session.check_registration().await.unwrap(),
        RegistrationState::Registered("Alice".into())
    );
    assert_eq!(session.caller_name(), "Alice");
}

#[tokio::test]
async fn failed_registration_leaves_state_unchanged() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.start().await.unwrap();

    ledger.fail_next_mutation(GatewayError::transport("connection reset"));
    let err = session.register("Alice").await.unwrap_err();

    assert!(err.may_have_committed());
    assert_eq!(session.registration(), RegistrationState::NotRegistered);
    assert!(session.snapshot().is_none());
}

#[tokio::test]
async fn submission_scenario() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");

    let expense = session.submit_expense("Dinner", &dinner()).await.unwrap();
    assert_eq!(expense.label, "Dinner");

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.expenses.len(), 1);
    let stored = &snapshot.expenses[0];
    assert_eq!(stored.label, "Dinner");
    assert_eq!(stored.participants.len(), 2);
    assert_eq!(stored.participants[0].amount_paid, Amount::from_base_units(10 * ETHER));
    assert_eq!(stored.participants[0].amount_owed, Amount::from_base_units(5 * ETHER));
    assert_eq!(stored.participants[1].amount_paid, Amount::ZERO);
    assert_eq!(stored.participants[1].amount_owed, Amount::from_base_units(5 * ETHER));

    let five = SignedAmount::from_base_units(5 * ETHER as i128);
    assert_eq!(session.net_balance(&Address::new("0xA")), five);
    assert_eq!(session.net_balance(&Address::new("0xB")), -five);

    let codec = session.codec();
    assert_eq!(codec.signed_to_display_units(session.net_balance(&Address::new("0xA"))), "5.0");
    assert_eq!(codec.format_fixed(-five, 5), "-5.00000");
}

#[tokio::test]
async fn returned_expense_comes_from_synchronized_snapshot() {
    let ledger = InMemoryLedger::new();
    ledger.set_clock(|| 1_700_000_000);
    let session = session(&ledger, "0xA");

    let expense = session.submit_expense("Dinner", &dinner()).await.unwrap();
    assert_eq!(expense.timestamp.timestamp(), 1_700_000_000);
    assert_eq!(Some(&expense), session.snapshot().unwrap().expense(0));
}

#[tokio::test]
async fn validation_rejections_make_no_remote_calls() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");

    let err = session.submit_expense("", &dinner()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = session.submit_expense("X", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = session
        .submit_expense("X", &[ExpenseEntry::new("0xA", "1.0000000000000000001", "0")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!err.may_have_committed());

    assert_eq!(ledger.call_count(), 0);
    assert_eq!(ledger.expense_total(), 0);
}

#[tokio::test]
async fn count_failure_keeps_previous_snapshot() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.submit_expense("Dinner", &dinner()).await.unwrap();
    let before = session.snapshot().unwrap();

    ledger.fail_expense_count(true);
    let err = session.synchronize().await.unwrap_err();
    assert!(matches!(err, Error::SyncFailed(_)));

    let after = session.snapshot().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn post_commit_sync_failure_does_not_fail_submission() {
    let ledger = InMemoryLedger::new();
    ledger.set_clock(|| 1_700_000_000);
    let session = session(&ledger, "0xA");

    ledger.fail_expense_count(true);
    let expense = session.submit_expense("Dinner", &dinner()).await.unwrap();

    assert_eq!(expense.id, 0);
    assert_eq!(expense.participants.len(), 2);
    assert!(session.snapshot().is_none());
    assert_eq!(session.draft().label, "");
    assert_eq!(ledger.expense_total(), 1);
}

#[tokio::test]
async fn repeated_sync_is_idempotent_and_ordered() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.register("Alice").await.unwrap();
    for label in ["Dinner", "Taxi", "Hotel", "Museum"] {
        session.submit_expense(label, &dinner()).await.unwrap();
    }

    let first = session.synchronize().await.unwrap();
    let second = session.synchronize().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.expenses, second.expenses);
    assert_eq!(first.people, second.people);

    assert!(second.expenses.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test]
async fn failing_participant_is_zeroed_in_isolation() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.submit_expense("Dinner", &dinner()).await.unwrap();
    session.submit_expense("Taxi", &dinner()).await.unwrap();

    ledger.fail_amounts(1, Address::new("0xB"));
    let snapshot = session.synchronize().await.unwrap();

    let taxi = snapshot.expense(1).unwrap();
    assert_eq!(taxi.participants[0].amount_paid, Amount::from_base_units(10 * ETHER));
    assert_eq!(taxi.participants[1].amount_paid, Amount::ZERO);
    assert_eq!(taxi.participants[1].amount_owed, Amount::ZERO);
    assert_eq!(snapshot.expense(0).unwrap().participants[1].amount_owed, Amount::from_base_units(5 * ETHER));
    assert!(!snapshot.is_complete());
}

#[tokio::test]
async fn account_change_resets_session() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.register("Alice").await.unwrap();
    session.edit_draft(|draft| draft.set_label("half-typed"));
    assert!(session.snapshot().is_some());

    let bob: Arc<dyn LedgerGateway> = Arc::new(ledger.connect(Address::new("0xB")));
    session.handle(SessionEvent::AccountChanged(bob)).await.unwrap();

    assert_eq!(session.caller(), Address::new("0xB"));
    assert_eq!(session.registration(), RegistrationState::NotRegistered);
    assert_eq!(session.caller_name(), "");
    assert!(session.snapshot().is_none());
    assert_eq!(session.draft().label, "");

    // Switching back to a registered identity loads its ledger view
    let alice: Arc<dyn LedgerGateway> = Arc::new(ledger.connect(Address::new("0xA")));
    session.handle(SessionEvent::AccountChanged(alice)).await.unwrap();
    assert_eq!(session.registration().name(), Some("Alice"));
    assert_eq!(session.snapshot().unwrap().people.len(), 1);
}

#[tokio::test]
async fn audit_reports_duplicate_address_divergence() {
    let ledger = InMemoryLedger::new();
    let session = session(&ledger, "0xA");
    session.register("Alice").await.unwrap();
    session
        .submit_expense(
            "Split twice",
            &[ExpenseEntry::new("0xA", "3", "1"), ExpenseEntry::new("0xA", "1", "0")],
        )
        .await
        .unwrap();

    let audit = session.audit_balances().await.unwrap();
    assert_eq!(audit.checked, 1);
    assert_eq!(audit.divergences.len(), 1);
    assert_eq!(audit.divergences[0].remote, SignedAmount::from_base_units(3 * ETHER as i128));
    assert_eq!(audit.divergences[0].local, SignedAmount::from_base_units(2 * ETHER as i128));
}
