//! Shared harness for the database integration tests.
//!
//! Tests run against `DATABASE_URL` when it is set (a shared `PostgreSQL`
//! database), otherwise against a private in-memory `SQLite` database migrated
//! per test. Codes and source ids carry a per-fixture suffix so runs against a
//! shared database never collide.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use std::env;

use bukubesar_core::ledger::{AccountType, DraftEntry, DraftLine, SourceKey, SourceType};
use bukubesar_db::entities::accounts;
use bukubesar_db::migration::{Migrator, MigratorTrait};
use bukubesar_db::{LedgerEngine, NewAccount};
use bukubesar_shared::types::AccountId;
use bukubesar_shared::{DatabaseConfig, PostingConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use uuid::Uuid;

static POSTGRES_MIGRATED: OnceCell<()> = OnceCell::const_new();

fn database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
}

/// Opens a migrated connection.
pub async fn connect() -> DatabaseConnection {
    let shared = database_url();
    let config = DatabaseConfig {
        url: shared.clone().unwrap_or_else(|| "sqlite::memory:".to_string()),
        max_connections: 10,
        min_connections: 1,
        acquire_timeout_secs: 30,
    };
    let db = bukubesar_db::connect(&config)
        .await
        .expect("Failed to connect to test database");

    if shared.is_some() {
        POSTGRES_MIGRATED
            .get_or_init(|| async {
                Migrator::up(&db, None).await.expect("Failed to migrate");
            })
            .await;
    } else {
        Migrator::up(&db, None).await.expect("Failed to migrate");
    }
    db
}

/// Per-test world: an engine plus unique naming.
pub struct Fixture {
    pub engine: LedgerEngine,
    pub db: DatabaseConnection,
    suffix: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = connect().await;
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            engine: LedgerEngine::new(db.clone(), PostingConfig::default()),
            db,
            suffix,
        }
    }

    /// Unique account or subsidiary code derived from `base`.
    pub fn code(&self, base: &str) -> String {
        format!("{base}-{}", self.suffix)
    }

    /// Unique source key derived from `source_id`.
    pub fn key(&self, source_type: SourceType, source_id: &str) -> SourceKey {
        SourceKey::new(source_type, format!("{source_id}-{}", self.suffix))
    }

    /// Creates a postable account.
    pub async fn account(&self, base: &str, name: &str, account_type: AccountType) -> accounts::Model {
        self.engine
            .accounts()
            .create_account(NewAccount::new(self.code(base), name, account_type))
            .await
            .expect("Failed to create account")
    }

    /// Creates `1101` Kas (asset) and `4101` Pendapatan (revenue).
    pub async fn cash_and_revenue(&self) -> (accounts::Model, accounts::Model) {
        let cash = self.account("1101", "Kas", AccountType::Asset).await;
        let revenue = self.account("4101", "Pendapatan Penjualan", AccountType::Revenue).await;
        (cash, revenue)
    }

    /// Reported balance by the account's full code.
    pub async fn balance(&self, account: &accounts::Model) -> Decimal {
        self.engine
            .get_balance(&account.code)
            .await
            .expect("Failed to read balance")
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn id(account: &accounts::Model) -> AccountId {
    AccountId::from_uuid(account.id)
}

/// Two-line entry moving `amount` from `credit` to `debit`.
pub fn transfer(
    debit: &accounts::Model,
    credit: &accounts::Model,
    amount: Decimal,
) -> DraftEntry {
    DraftEntry::new(date(2024, 1, 15), "Test entry")
        .line(DraftLine::debit(id(debit), amount))
        .line(DraftLine::credit(id(credit), amount))
}
