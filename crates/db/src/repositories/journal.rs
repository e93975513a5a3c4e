//! Journal read model: entries with their lines, lookups by source key and number.

use bukubesar_core::ledger::{LedgerError, SourceKey};
use bukubesar_shared::types::JournalEntryId;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use super::error::DbResultExt;
use crate::entities::{journal_entries, journal_lines, sea_orm_active_enums::EntryStatus};

/// Journal entry with its lines in line-number order.
#[derive(Debug, Clone)]
pub struct JournalEntryWithLines {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Lines.
    pub lines: Vec<journal_lines::Model>,
}

/// Result of a posting call.
#[derive(Debug, Clone)]
pub struct PostedEntry {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Lines.
    pub lines: Vec<journal_lines::Model>,
    /// False when the call resolved to an entry that already existed.
    pub created: bool,
}

impl PostedEntry {
    /// Typed id of the entry.
    #[must_use]
    pub const fn id(&self) -> JournalEntryId {
        JournalEntryId::from_uuid(self.entry.id)
    }
}

/// The active (non-reversed) entry holding `key`, if any.
pub(crate) async fn find_active_by_key<C>(
    db: &C,
    key: &SourceKey,
) -> Result<Option<journal_entries::Model>, LedgerError>
where
    C: ConnectionTrait,
{
    journal_entries::Entity::find()
        .filter(journal_entries::Column::SourceType.eq(key.source_type.as_str()))
        .filter(journal_entries::Column::SourceId.eq(key.source_id.as_str()))
        .filter(journal_entries::Column::Status.ne(EntryStatus::Reversed))
        .one(db)
        .await
        .ledger()
}

/// Lines of one entry in line-number order.
pub(crate) async fn load_lines<C>(
    db: &C,
    entry_id: JournalEntryId,
) -> Result<Vec<journal_lines::Model>, LedgerError>
where
    C: ConnectionTrait,
{
    journal_lines::Entity::find()
        .filter(journal_lines::Column::JournalId.eq(entry_id.into_inner()))
        .order_by_asc(journal_lines::Column::LineNumber)
        .all(db)
        .await
        .ledger()
}

/// The entry that reverses `original`, if any.
pub(crate) async fn find_reversal_of<C>(
    db: &C,
    original: JournalEntryId,
) -> Result<Option<journal_entries::Model>, LedgerError>
where
    C: ConnectionTrait,
{
    journal_entries::Entity::find()
        .filter(journal_entries::Column::Reverses.eq(original.into_inner()))
        .one(db)
        .await
        .ledger()
}

/// Wraps an entry that already existed as a non-created posting result.
pub(crate) async fn existing<C>(
    db: &C,
    entry: journal_entries::Model,
) -> Result<PostedEntry, LedgerError>
where
    C: ConnectionTrait,
{
    let lines = load_lines(db, JournalEntryId::from_uuid(entry.id)).await?;
    Ok(PostedEntry {
        entry,
        lines,
        created: false,
    })
}

/// Journal repository for read-only entry lookups.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if no entry has this id.
    pub async fn get_entry(&self, id: JournalEntryId) -> Result<JournalEntryWithLines, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .ledger()?
            .ok_or(LedgerError::EntryNotFound(id))?;
        let lines = load_lines(&self.db, id).await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Finds an entry by its human-readable number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_number(
        &self,
        entry_number: &str,
    ) -> Result<Option<journal_entries::Model>, LedgerError> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::EntryNumber.eq(entry_number))
            .one(&self.db)
            .await
            .ledger()
    }

    /// Finds the active entry for an upstream source event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_key(
        &self,
        key: &SourceKey,
    ) -> Result<Option<journal_entries::Model>, LedgerError> {
        find_active_by_key(&self.db, key).await
    }

    /// Returns the reversing entry of `original`, if it has been reversed.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if `original` does not exist.
    pub async fn get_reversal(
        &self,
        original: JournalEntryId,
    ) -> Result<Option<JournalEntryWithLines>, LedgerError> {
        journal_entries::Entity::find_by_id(original.into_inner())
            .one(&self.db)
            .await
            .ledger()?
            .ok_or(LedgerError::EntryNotFound(original))?;

        let Some(entry) = find_reversal_of(&self.db, original).await? else {
            return Ok(None);
        };
        let lines = load_lines(&self.db, JournalEntryId::from_uuid(entry.id)).await?;
        Ok(Some(JournalEntryWithLines { entry, lines }))
    }
}
