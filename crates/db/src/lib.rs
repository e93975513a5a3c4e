//! Database layer with `SeaORM` entities, repositories and the posting engine.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories that run every ledger mutation in one transaction
//! - The [`LedgerEngine`] facade over the repositories
//! - Database migrations

pub mod engine;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use engine::LedgerEngine;
pub use entities::money::Money;
pub use repositories::{
    AccountRepository, EventLogRepository, FailPoint, JournalRepository, NewAccount,
    NewSubsidiary, PostedEntry, PostingRepository, ReconcileRepository, ReversalRepository,
    SubsidiaryRepository,
};

use std::time::Duration;

use bukubesar_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// In-memory `SQLite` databases are private to one connection, so their pool is
/// pinned to a single connection.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let in_memory = config.url.starts_with("sqlite") && config.url.contains(":memory:");
    let (max, min) = if in_memory {
        (1, 1)
    } else {
        (config.max_connections, config.min_connections)
    };

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(max)
        .min_connections(min)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);

    Database::connect(options).await
}
