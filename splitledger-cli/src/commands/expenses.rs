//! Expenses command - expense history

use anyhow::Result;

use super::{get_context, load_registered};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let Some(snapshot) = load_registered(&ctx).await? else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.expenses)?);
        return Ok(());
    }

    if snapshot.expenses.is_empty() {
        output::info("No expenses yet. Add one with 'sl add'.");
        return Ok(());
    }

    let codec = ctx.session.codec();
    let mut table = output::create_table();
    table.set_header(vec!["Label", "Date", "Participant", "Paid", "Owes"]);

    for expense in &snapshot.expenses {
        let date = expense.timestamp.format("%Y-%m-%d %H:%M").to_string();
        for (i, entry) in expense.participants.iter().enumerate() {
            let (label, date) = if i == 0 {
                (expense.label.as_str(), date.as_str())
            } else {
                ("", "")
            };
            table.add_row(vec![
                label.to_string(),
                date.to_string(),
                snapshot.display_name(&entry.address),
                codec.to_display_units(entry.amount_paid),
                codec.to_display_units(entry.amount_owed),
            ]);
        }
    }
    println!("{}", table);

    for warning in &snapshot.warnings {
        output::warning(&format!("warning: {}", warning));
    }
    Ok(())
}
