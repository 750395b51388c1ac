//! Setup command - store the relay endpoint, ledger and account

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;
use splitledger_core::config::Config;

use super::get_splitledger_dir;

pub fn run(url: Option<String>, ledger: Option<String>, account: Option<String>) -> Result<()> {
    let dir = get_splitledger_dir()?;
    // Env overrides stay out of the saved file
    let mut config = Config::from_file(&dir)?;

    if let Some(url) = url {
        config.gateway_url = url;
    }

    config.ledger_address = Some(match ledger {
        Some(ledger) => ledger,
        None => prompt("Ledger address", config.ledger_address.take())?,
    });
    config.account = Some(match account {
        Some(account) => account,
        None => prompt("Your account address", config.account.take())?,
    });

    config.save(&dir).context("Failed to save settings")?;

    println!("{} Settings saved to {}", "Success!".green(), dir.display());
    println!("Run 'sl status' to check your registration.");
    Ok(())
}

fn prompt(label: &str, current: Option<String>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(current) = current {
        input = input.default(current);
    }
    input
        .interact_text()
        .with_context(|| format!("Failed to read {}", label.to_lowercase()))
}
