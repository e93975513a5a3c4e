//! Command implementations.

use anyhow::{Context, bail};
use bukubesar_db::LedgerEngine;
use bukubesar_db::entities::accounts;
use bukubesar_shared::types::{AccountId, JournalEntryId, SubsidiaryId};
use chrono::Utc;
use serde_json::json;

use crate::cli::{
    BalanceArgs, Command, HealArgs, OutputFormat, ReconcileArgs, ReverseArgs, SubsidiaryCommand,
};

/// Runs one command against the engine.
pub async fn run(engine: &LedgerEngine, command: Command, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Balance(args) => balance(engine, args, format).await,
        Command::Reconcile(args) => reconcile(engine, args, format).await,
        Command::Heal(args) => heal(engine, args, format).await,
        Command::Reverse(args) => reverse(engine, args, format).await,
        Command::Subsidiaries(SubsidiaryCommand::Reconcile) => {
            reconcile_subsidiaries(engine, format).await
        }
        Command::Subsidiaries(SubsidiaryCommand::Heal { code }) => {
            heal_subsidiary(engine, &code, format).await
        }
    }
}

async fn account_by_code(engine: &LedgerEngine, code: &str) -> anyhow::Result<accounts::Model> {
    engine
        .accounts()
        .find_by_code(code)
        .await?
        .with_context(|| format!("Account {code} not found"))
}

async fn balance(engine: &LedgerEngine, args: BalanceArgs, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(code) = args.code {
        let balance = engine.get_balance(&code).await?;
        match format {
            OutputFormat::Json => println!("{}", json!({ "code": code, "balance": balance })),
            OutputFormat::Text => println!("{code}\t{balance}"),
        }
        return Ok(());
    }

    let balances = engine.accounts().balances().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&balances)?),
        OutputFormat::Text => {
            for b in &balances {
                let marker = if b.is_header { "*" } else { " " };
                println!("{marker} {:<12} {:<32} {:>20}", b.code, b.name, b.balance);
            }
        }
    }
    Ok(())
}

async fn reconcile(engine: &LedgerEngine, args: ReconcileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let account = match args.account {
        Some(code) => Some(AccountId::from_uuid(account_by_code(engine, &code).await?.id)),
        None => None,
    };

    let found = engine.reconcile(account).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        OutputFormat::Text if found.is_empty() => println!("All balances match their journal lines"),
        OutputFormat::Text => {
            for d in &found {
                println!(
                    "{:<12} cached {:>20}  calculated {:>20}  delta {:>20}",
                    d.code, d.cached, d.calculated, d.delta
                );
            }
        }
    }

    if !found.is_empty() {
        bail!("{} account(s) out of balance", found.len());
    }
    Ok(())
}

async fn heal(engine: &LedgerEngine, args: HealArgs, format: OutputFormat) -> anyhow::Result<()> {
    let account = account_by_code(engine, &args.code).await?;
    let healed = engine.heal(AccountId::from_uuid(account.id)).await?;

    match (format, healed) {
        (OutputFormat::Json, healed) => println!("{}", json!({ "code": args.code, "healed": healed })),
        (OutputFormat::Text, Some(d)) => {
            println!("{}: {} -> {}", d.code, d.cached, d.calculated);
        }
        (OutputFormat::Text, None) => println!("{}: already consistent", args.code),
    }
    Ok(())
}

async fn reverse(engine: &LedgerEngine, args: ReverseArgs, format: OutputFormat) -> anyhow::Result<()> {
    let original = engine
        .journal()
        .find_by_number(&args.entry_number)
        .await?
        .with_context(|| format!("Journal entry {} not found", args.entry_number))?;

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let reversal = engine
        .reverse_dated(JournalEntryId::from_uuid(original.id), &args.reason, date)
        .await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "original": original.entry_number,
                "reversal": reversal.entry.entry_number,
                "created": reversal.created,
            })
        ),
        OutputFormat::Text if reversal.created => {
            println!("{} reversed by {}", original.entry_number, reversal.entry.entry_number);
        }
        OutputFormat::Text => println!(
            "{} was already reversed by {}",
            original.entry_number, reversal.entry.entry_number
        ),
    }
    Ok(())
}

async fn reconcile_subsidiaries(engine: &LedgerEngine, format: OutputFormat) -> anyhow::Result<()> {
    let found = engine.reconcile_subsidiaries().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        OutputFormat::Text if found.is_empty() => println!("All subsidiaries match their accounts"),
        OutputFormat::Text => {
            for d in &found {
                println!(
                    "{:<16} subsidiary {:>20}  account {:>20}",
                    d.code, d.subsidiary_balance, d.account_balance
                );
            }
        }
    }

    if !found.is_empty() {
        bail!("{} subsidiary ledger(s) out of sync", found.len());
    }
    Ok(())
}

async fn heal_subsidiary(engine: &LedgerEngine, code: &str, format: OutputFormat) -> anyhow::Result<()> {
    let subsidiary = engine
        .subsidiaries()
        .find_by_code(code)
        .await?
        .with_context(|| format!("Subsidiary {code} not found"))?;

    let healed = engine
        .reconciler()
        .heal_subsidiary(SubsidiaryId::from_uuid(subsidiary.id))
        .await?;

    match (format, healed) {
        (OutputFormat::Json, healed) => println!("{}", json!({ "code": code, "healed": healed })),
        (OutputFormat::Text, Some(d)) => {
            println!("{code}: {} -> {}", d.subsidiary_balance, d.account_balance);
        }
        (OutputFormat::Text, None) => println!("{code}: already in sync"),
    }
    Ok(())
}
