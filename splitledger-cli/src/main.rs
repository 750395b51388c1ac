//! SplitLedger CLI - shared expenses in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{add, audit, demo, expenses, people, register, setup, status};

/// SplitLedger - shared expenses on a remote ledger
#[derive(Parser)]
#[command(name = "sl", version, about, long_about = None)]
struct Cli {
    /// Log ledger calls and synchronization detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show registration state and ledger summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the relay endpoint, ledger address and account
    Setup {
        /// Relay endpoint URL
        #[arg(long)]
        url: Option<String>,
        /// Ledger address (prompted for when omitted)
        #[arg(long)]
        ledger: Option<String>,
        /// Account address (prompted for when omitted)
        #[arg(long)]
        account: Option<String>,
    },

    /// Register the configured account under a display name
    Register {
        /// Display name (prompted for when omitted)
        name: Option<String>,
    },

    /// List the expense history
    Expenses {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered people with their net balances
    People {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a new expense
    Add {
        /// Expense label
        #[arg(long)]
        label: String,
        /// Participant as <address>:<paid>:<owed> (repeatable)
        #[arg(long = "participant", short = 'p', required = true)]
        participants: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare locally computed balances with the ledger's own
    Audit {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk through the workflows against an in-memory ledger
    Demo,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json).await,
        Commands::Setup { url, ledger, account } => setup::run(url, ledger, account),
        Commands::Register { name } => register::run(name).await,
        Commands::Expenses { json } => expenses::run(json).await,
        Commands::People { json } => people::run(json).await,
        Commands::Add { label, participants, json } => add::run(label, participants, json).await,
        Commands::Audit { json } => audit::run(json).await,
        Commands::Demo => demo::run().await,
    }
}
