//! Reversal repository.
//!
//! A reversal is a new posted entry with every line's sides swapped. The original
//! entry keeps its lines and only changes status to reversed.

use bukubesar_core::audit::{AuditEvent, EntityType, EventAction};
use bukubesar_core::ledger::{EntryStatus, LedgerError};
use bukubesar_core::reversal::{OriginalLine, ReversalInput, ReversalService, Reversibility};
use bukubesar_shared::PostingConfig;
use bukubesar_shared::types::{AccountId, JournalEntryId};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QuerySelect, Set};
use serde_json::json;
use tracing::{debug, info};

use super::error::DbResultExt;
use super::event_log;
use super::journal::{self, PostedEntry};
use super::posting::{EntryHeader, PostingRepository, WriteOutcome};
use crate::entities::{journal_entries, sea_orm_active_enums};

/// Reversal repository.
#[derive(Debug, Clone)]
pub struct ReversalRepository {
    posting: PostingRepository,
}

impl ReversalRepository {
    /// Creates a new reversal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: PostingConfig) -> Self {
        Self {
            posting: PostingRepository::new(db, config),
        }
    }

    /// Reverses a posted entry as of today.
    ///
    /// # Errors
    ///
    /// See [`Self::reverse_dated`].
    pub async fn reverse(
        &self,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> Result<PostedEntry, LedgerError> {
        self.reverse_dated(entry_id, reason, Utc::now().date_naive())
            .await
    }

    /// Reverses a posted entry with the given accounting date.
    ///
    /// Reversing an entry that is already reversed returns the existing reversal
    /// with `created == false`.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry does not exist
    /// - `InvalidState` if the entry is a draft
    /// - `CannotReverseReversal` if the entry is itself a reversal
    /// - `ReasonRequired` for a blank reason
    /// - `Busy` on lock timeout
    pub async fn reverse_dated(
        &self,
        entry_id: JournalEntryId,
        reason: &str,
        reversal_date: NaiveDate,
    ) -> Result<PostedEntry, LedgerError> {
        let db = self.posting.connection();

        if let Some(reversal) = journal::find_reversal_of(db, entry_id).await? {
            debug!(entry_id = %entry_id, reversal_id = %reversal.id, "Entry already reversed");
            return journal::existing(db, reversal).await;
        }

        let txn = self.posting.begin().await?;

        let original = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let status: EntryStatus = original.status.into();
        if status == EntryStatus::Reversed
            && let Some(reversal) = journal::find_reversal_of(&txn, entry_id).await?
        {
            let existing = journal::existing(&txn, reversal).await?;
            txn.rollback().await.ledger()?;
            return Ok(existing);
        }

        ReversalService::check_reversible(
            entry_id,
            status,
            original.reversed_by.map(JournalEntryId::from_uuid),
            original.reverses.map(JournalEntryId::from_uuid),
        )?;

        let lines: Vec<OriginalLine> = journal::load_lines(&txn, entry_id)
            .await?
            .into_iter()
            .map(|line| OriginalLine {
                account_id: AccountId::from_uuid(line.account_id),
                debit: line.debit_amount.amount(),
                credit: line.credit_amount.amount(),
                description: line.description,
            })
            .collect();

        if !ReversalService::validate_reversal(&lines) {
            return Err(LedgerError::Internal(format!(
                "stored lines of {} do not balance",
                original.entry_number
            )));
        }

        let draft = ReversalService::build(&ReversalInput {
            original_id: entry_id,
            original_number: &original.entry_number,
            reversal_date,
            reason,
            lines: &lines,
        })?;

        let header = EntryHeader {
            number: Some(ReversalService::reversal_number(
                &self.posting.config().reversal_prefix,
                &original.entry_number,
            )),
            reverses: Some(entry_id),
            status: EntryStatus::Posted,
        };

        let reversal = match self.posting.write_entry(&txn, &draft, header).await? {
            WriteOutcome::Written(posted) => posted,
            WriteOutcome::KeyConflict => {
                txn.rollback().await.ledger()?;
                return match journal::find_reversal_of(db, entry_id).await? {
                    Some(reversal) => journal::existing(db, reversal).await,
                    None => Err(LedgerError::Busy(format!(
                        "reversal of {entry_id} is in progress elsewhere"
                    ))),
                };
            }
        };

        let number = original.entry_number.clone();
        let mut active: journal_entries::ActiveModel = original.into();
        active.status = Set(sea_orm_active_enums::EntryStatus::Reversed);
        active.reversed_by = Set(Some(reversal.entry.id));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::new(
                EntityType::JournalEntry,
                entry_id.into_inner(),
                EventAction::Reverse,
            )
            .with_before(json!({ "status": EntryStatus::Posted.as_str() }))
            .with_after(json!({
                "status": EntryStatus::Reversed.as_str(),
                "reversed_by": reversal.entry.id,
            }))
            .with_reason(reason.trim()),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(
            entry_id = %entry_id,
            entry_number = %number,
            reversal_number = %reversal.entry.entry_number,
            "Journal entry reversed"
        );

        Ok(reversal)
    }

    /// Explains whether an entry can be reversed now.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the entry does not exist.
    pub async fn can_reverse(&self, entry_id: JournalEntryId) -> Result<Reversibility, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .one(self.posting.connection())
            .await
            .ledger()?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        Ok(ReversalService::reversibility(
            entry.status.into(),
            entry.reversed_by.map(JournalEntryId::from_uuid),
            entry.reverses.map(JournalEntryId::from_uuid),
        ))
    }
}
