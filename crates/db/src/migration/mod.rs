//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

use sea_orm::ConnectionTrait;
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_ledger;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_ledger::Migration)]
    }
}

/// Runs a multi-statement script one statement at a time.
///
/// Scripts must not contain `;` inside statements.
pub(crate) async fn run_script<C>(db: &C, script: &str) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        db.execute_unprepared(statement).await?;
    }
    Ok(())
}
