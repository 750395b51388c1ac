//! People command - registered people and their net balances

use anyhow::Result;
use comfy_table::Cell;

use super::{get_context, load_registered};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    if load_registered(&ctx).await?.is_none() {
        return Ok(());
    }

    let people = ctx.session.people_with_balances();
    if json {
        println!("{}", serde_json::to_string_pretty(&people)?);
        return Ok(());
    }

    if people.is_empty() {
        output::info("Nobody has registered yet.");
        return Ok(());
    }

    let codec = ctx.session.codec();
    let mut table = output::create_table();
    table.set_header(vec![
        "Name".to_string(),
        "Address".to_string(),
        format!("Net balance ({})", ctx.config.symbol),
    ]);
    for row in &people {
        table.add_row(vec![
            Cell::new(&row.person.name),
            Cell::new(row.person.address.short()),
            output::balance_cell(&codec, row.balance, ctx.config.fraction_digits),
        ]);
    }
    println!("{}", table);
    Ok(())
}
