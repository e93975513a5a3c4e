//! Chart of accounts seeder for development and testing.
//!
//! Seeds a small Indonesian chart of accounts and two cash subsidiary ledgers
//! linked to their GL accounts. Rows that already exist are skipped, so the
//! seeder can run repeatedly.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use bukubesar_core::ledger::AccountType;
use bukubesar_core::subsidiary::SubsidiaryKind;
use bukubesar_db::{LedgerEngine, NewAccount, NewSubsidiary};
use bukubesar_shared::AppConfig;
use bukubesar_shared::types::{AccountId, SubsidiaryId};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `(code, name, type, parent, is_header)`, parents before children.
const CHART: &[(&str, &str, AccountType, Option<&str>, bool)] = &[
    ("1000", "Aset", AccountType::Asset, None, true),
    ("1100", "Kas & Bank", AccountType::Asset, Some("1000"), true),
    ("1101", "Kas", AccountType::Asset, Some("1100"), false),
    ("1102", "Bank Mandiri", AccountType::Asset, Some("1100"), false),
    ("1201", "Piutang Usaha", AccountType::Asset, Some("1000"), false),
    ("2000", "Liabilitas", AccountType::Liability, None, true),
    ("2101", "Utang Usaha", AccountType::Liability, Some("2000"), false),
    ("3000", "Ekuitas", AccountType::Equity, None, true),
    ("3101", "Modal Disetor", AccountType::Equity, Some("3000"), false),
    ("4000", "Pendapatan", AccountType::Revenue, None, true),
    ("4101", "Pendapatan Penjualan", AccountType::Revenue, Some("4000"), false),
    ("5000", "Beban", AccountType::Expense, None, true),
    ("5101", "Beban Operasional", AccountType::Expense, Some("5000"), false),
];

/// `(code, name, kind, linked account code)`.
const SUBSIDIARIES: &[(&str, &str, SubsidiaryKind, &str)] = &[
    ("KAS-KECIL", "Kas Kecil", SubsidiaryKind::CashBank, "1101"),
    ("BANK-MANDIRI", "Rekening Bank Mandiri", SubsidiaryKind::CashBank, "1102"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bukubesar=info,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let engine = LedgerEngine::connect(&config)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    seed_chart(&engine).await?;
    seed_subsidiaries(&engine).await?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_chart(engine: &LedgerEngine) -> anyhow::Result<()> {
    for &(code, name, account_type, parent, is_header) in CHART {
        if engine.accounts().find_by_code(code).await?.is_some() {
            info!(code, "Account already exists, skipping");
            continue;
        }

        let mut input = NewAccount::new(code, name, account_type);
        if is_header {
            input = input.header();
        }
        if let Some(parent) = parent {
            input = input.under(parent);
        }

        engine
            .accounts()
            .create_account(input)
            .await
            .with_context(|| format!("Failed to create account {code}"))?;
        info!(code, name, "Account created");
    }
    Ok(())
}

async fn seed_subsidiaries(engine: &LedgerEngine) -> anyhow::Result<()> {
    for &(code, name, kind, account_code) in SUBSIDIARIES {
        let subsidiary = match engine.subsidiaries().find_by_code(code).await? {
            Some(existing) => existing,
            None => {
                engine
                    .subsidiaries()
                    .create(NewSubsidiary {
                        code: code.to_string(),
                        name: name.to_string(),
                        kind,
                    })
                    .await?
            }
        };

        if subsidiary.linked_account_id.is_some() {
            info!(code, "Subsidiary already linked, skipping");
            continue;
        }

        let account = engine
            .accounts()
            .find_by_code(account_code)
            .await?
            .with_context(|| format!("Account {account_code} missing from chart"))?;

        engine
            .link_subsidiary(
                SubsidiaryId::from_uuid(subsidiary.id),
                AccountId::from_uuid(account.id),
            )
            .await?;
        info!(code, account_code, "Subsidiary linked");
    }
    Ok(())
}
