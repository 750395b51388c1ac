//! Register command - register the configured account under a name

use anyhow::{Context, Result};
use dialoguer::Input;

use super::{get_context, with_spinner};
use crate::output;

pub async fn run(name: Option<String>) -> Result<()> {
    let ctx = get_context()?;

    let name = match name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Your name")
            .interact_text()
            .context("Failed to read name")?,
    };

    let state = with_spinner("Waiting for confirmation...", ctx.session.register(&name))
        .await
        .context("Registration failed")?;

    output::success(&format!(
        "Account {} {}",
        ctx.session.caller(),
        output::describe_registration(&state)
    ));
    Ok(())
}
