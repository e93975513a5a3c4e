//! Mapping of database failures onto the ledger error taxonomy.

use bukubesar_core::ledger::LedgerError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// `PostgreSQL` SQLSTATEs that mean "try again": lock timeout, deadlock and
/// serialization failure.
const PG_RETRYABLE: &[&str] = &["55P03", "40P01", "40001"];

/// `SQLite` result codes for a busy or locked database, including extended codes.
const SQLITE_RETRYABLE: &[&str] = &["5", "6", "261", "262", "517"];

fn sqlx_error(err: &DbErr) -> Option<&sqlx::Error> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => Some(e),
        _ => None,
    }
}

/// Returns true for lock waits, deadlocks and pool exhaustion.
pub(crate) fn is_busy(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    match sqlx_error(err) {
        Some(sqlx::Error::PoolTimedOut) => true,
        Some(sqlx::Error::Database(db)) => db.code().is_some_and(|code| {
            PG_RETRYABLE.contains(&code.as_ref()) || SQLITE_RETRYABLE.contains(&code.as_ref())
        }),
        _ => false,
    }
}

/// Returns true if `err` is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Converts a database error into the public taxonomy.
pub(crate) fn map_db_err(err: DbErr) -> LedgerError {
    if is_busy(&err) {
        LedgerError::Busy(err.to_string())
    } else {
        LedgerError::Database(err.to_string())
    }
}

/// `?`-friendly conversion for `SeaORM` results.
pub(crate) trait DbResultExt<T> {
    /// Maps the error side with [`map_db_err`].
    fn ledger(self) -> Result<T, LedgerError>;
}

impl<T> DbResultExt<T> for Result<T, DbErr> {
    fn ledger(self) -> Result<T, LedgerError> {
        self.map_err(map_db_err)
    }
}
