//! Repository layer for database operations.
//!
//! Each repository wraps a `DatabaseConnection` and exposes one ledger concern.
//! Mutations open their own transaction and commit it before returning.

pub mod account;
pub(crate) mod error;
pub mod event_log;
pub mod journal;
pub mod posting;
pub mod reconcile;
pub mod reversal;
pub mod subsidiary;

pub use account::{AccountBalance, AccountRepository, NewAccount};
pub use event_log::EventLogRepository;
pub use journal::{JournalEntryWithLines, JournalRepository, PostedEntry};
pub use posting::{FailPoint, PostingRepository};
pub use reconcile::ReconcileRepository;
pub use reversal::ReversalRepository;
pub use subsidiary::{NewSubsidiary, SubsidiaryRepository};

use bukubesar_core::ledger::LedgerError;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction,
    IsolationLevel, TransactionTrait,
};

use self::error::DbResultExt;

/// Opens a read-write transaction.
///
/// On `PostgreSQL` the transaction runs at READ COMMITTED and row lock waits are
/// capped at `lock_timeout_ms`, after which the statement fails with a retryable
/// error. `SQLite` serialises writers on its own.
pub(crate) async fn begin_write(
    db: &DatabaseConnection,
    lock_timeout_ms: u64,
) -> Result<DatabaseTransaction, LedgerError> {
    if db.get_database_backend() != DatabaseBackend::Postgres {
        return db.begin().await.ledger();
    }

    let txn = db
        .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
        .await
        .ledger()?;
    txn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{lock_timeout_ms}ms'"))
        .await
        .ledger()?;
    Ok(txn)
}

/// Opens a read-only snapshot so multi-query reads see one committed state.
pub(crate) async fn begin_read(db: &DatabaseConnection) -> Result<DatabaseTransaction, LedgerError> {
    if db.get_database_backend() != DatabaseBackend::Postgres {
        return db.begin().await.ledger();
    }

    db.begin_with_config(
        Some(IsolationLevel::RepeatableRead),
        Some(AccessMode::ReadOnly),
    )
    .await
    .ledger()
}
