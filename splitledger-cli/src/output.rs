//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use splitledger_core::{AmountCodec, RegistrationState, SignedAmount};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Balance cell with fixed fraction digits; negative balances in red
pub fn balance_cell(codec: &AmountCodec, amount: SignedAmount, fraction_digits: u32) -> Cell {
    let text = codec.format_fixed(amount, fraction_digits);
    if amount.is_negative() {
        Cell::new(text).fg(Color::Red)
    } else {
        Cell::new(text)
    }
}

pub fn describe_registration(state: &RegistrationState) -> String {
    match state {
        RegistrationState::Unknown => "unknown".to_string(),
        RegistrationState::NotRegistered => "not registered".to_string(),
        RegistrationState::Registered(name) => format!("registered as {}", name),
    }
}

/// Spinner on stderr while waiting on the ledger; hidden when not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
