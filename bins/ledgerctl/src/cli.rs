//! Command line definition.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Operator tool for the general ledger.
#[derive(Debug, Parser)]
#[command(name = "ledgerctl", version, about = "Inspect and repair general ledger balances")]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "BUKUBESAR_JSON_LOGS")]
    pub json_logs: bool,
}

/// Result rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain text.
    Text,
    /// One JSON document.
    Json,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the balance of one account, or of every account
    Balance(BalanceArgs),
    /// Report cached balances that differ from their journal lines
    Reconcile(ReconcileArgs),
    /// Correct one account's cached balance from its journal lines
    Heal(HealArgs),
    /// Reverse a posted journal entry
    Reverse(ReverseArgs),
    /// Subsidiary ledger checks
    #[command(subcommand)]
    Subsidiaries(SubsidiaryCommand),
}

/// `balance [CODE]`
#[derive(Debug, Args)]
pub struct BalanceArgs {
    /// Account code. Headers roll up their children.
    pub code: Option<String>,
}

/// `reconcile [--account CODE]`
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Limit the check to one account.
    #[arg(long)]
    pub account: Option<String>,
}

/// `heal CODE`
#[derive(Debug, Args)]
pub struct HealArgs {
    /// Account code.
    pub code: String,
}

/// `reverse ENTRY_NUMBER --reason TEXT`
#[derive(Debug, Args)]
pub struct ReverseArgs {
    /// Entry number, e.g. `JE-202401-000001`.
    pub entry_number: String,

    /// Why the entry is reversed.
    #[arg(long)]
    pub reason: String,

    /// Accounting date of the reversal. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// Subsidiary subcommands.
#[derive(Debug, Subcommand)]
pub enum SubsidiaryCommand {
    /// Report subsidiaries whose balance differs from their account
    Reconcile,
    /// Copy the linked account balance into a subsidiary
    Heal {
        /// Subsidiary code.
        code: String,
    },
}
