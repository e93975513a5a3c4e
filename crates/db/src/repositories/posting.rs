//! Posting repository.
//!
//! This is the only code path that moves account and subsidiary balances. Every
//! call runs in one transaction that takes row locks in a fixed global order:
//! entry row, accounts ascending by id, entry number counter, subsidiaries
//! ascending by id. Validation failures happen before the first write.

use std::collections::BTreeSet;

use bukubesar_core::audit::{AuditEvent, EntityType, EventAction};
use bukubesar_core::ledger::{
    AccountInfo, BalanceDelta, DraftEntry, DraftLine, EntryStatus, LedgerError, PostingPlan,
    PostingService, validate_lines,
};
use bukubesar_shared::PostingConfig;
use bukubesar_shared::types::{AccountId, JournalEntryId, JournalLineId};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use tracing::{debug, info};

use super::error::{DbResultExt, is_unique_violation, map_db_err};
use super::journal::{self, PostedEntry};
use super::{begin_write, event_log};
use crate::entities::{
    accounts, entry_sequences, journal_entries, journal_lines, sea_orm_active_enums,
    subsidiary_ledgers,
};

/// Injected failure used by tests to prove that a failed posting leaves no trace.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// Fail after the lines are written and before any balance moves.
    BeforeBalanceUpdate,
}

/// Header fields chosen by the caller of [`write_entry`].
#[derive(Debug, Clone)]
pub(crate) struct EntryHeader {
    /// Explicit entry number. Drawn from the counter when absent.
    pub number: Option<String>,
    /// Original entry when writing a reversal.
    pub reverses: Option<JournalEntryId>,
    /// `Posted` applies balances; `Draft` only stores the entry.
    pub status: EntryStatus,
}

/// Outcome of the shared write path.
#[derive(Debug)]
pub(crate) enum WriteOutcome {
    /// The entry was written inside the transaction.
    Written(PostedEntry),
    /// Another active entry holds the source key. The transaction is unusable.
    KeyConflict,
}

/// Posting repository.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: DatabaseConnection,
    config: PostingConfig,
    fail_point: Option<FailPoint>,
}

impl PostingRepository {
    /// Creates a new posting repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: PostingConfig) -> Self {
        Self {
            db,
            config,
            fail_point: None,
        }
    }

    /// Arms a failure point for tests.
    #[doc(hidden)]
    #[must_use]
    pub const fn with_fail_point(mut self, fail_point: FailPoint) -> Self {
        self.fail_point = Some(fail_point);
        self
    }

    /// Posts a balanced entry and applies its balance deltas.
    ///
    /// When the entry carries a source key that an active entry already holds,
    /// that entry is returned with `created == false` and nothing is written.
    ///
    /// # Errors
    ///
    /// - Validation errors (`EmptyEntry`, `Unbalanced`, `ZeroAmount`,
    ///   `NegativeAmount`, `InvalidEntryType`, `AmountOutOfRange`, `InvalidAccount`)
    ///   before any write
    /// - `Busy` on lock timeout, deadlock or pool exhaustion
    pub async fn post(&self, draft: &DraftEntry) -> Result<PostedEntry, LedgerError> {
        self.write(
            draft,
            EntryHeader {
                number: None,
                reverses: None,
                status: EntryStatus::Posted,
            },
        )
        .await
    }

    /// Stores a validated entry as a draft. Balances do not move.
    ///
    /// A draft holds its source key like any active entry.
    ///
    /// # Errors
    ///
    /// Same validation errors as [`Self::post`].
    pub async fn create_draft(&self, draft: &DraftEntry) -> Result<PostedEntry, LedgerError> {
        self.write(
            draft,
            EntryHeader {
                number: None,
                reverses: None,
                status: EntryStatus::Draft,
            },
        )
        .await
    }

    /// Posts a stored draft through the same locked delta path.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry does not exist
    /// - `InvalidState` if the entry is not a draft
    /// - `InvalidAccount` if a line account was deactivated since the draft was made
    pub async fn post_draft(&self, entry_id: JournalEntryId) -> Result<PostedEntry, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

        let entry = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        PostingService::validate_can_post(entry_id, entry.status.into())?;

        let stored = journal::load_lines(&txn, entry_id).await?;
        let draft = DraftEntry {
            source: None,
            entry_date: entry.entry_date,
            description: entry.description.clone(),
            lines: stored
                .iter()
                .map(|line| DraftLine {
                    account_id: AccountId::from_uuid(line.account_id),
                    debit: line.debit_amount.amount(),
                    credit: line.credit_amount.amount(),
                    description: line.description.clone(),
                })
                .collect(),
        };

        let locked = lock_accounts(&txn, &draft).await?;
        let plan = plan_against(&draft, &locked)?;

        self.check_fail_point()?;
        apply_deltas(&txn, &plan.deltas, &locked, entry_id, EventAction::Post).await?;

        let now = Utc::now();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(sea_orm_active_enums::EntryStatus::Posted);
        active.posted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let entry = active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::JournalEntry, entry.id, EventAction::Post)
                .with_before(json!({ "status": EntryStatus::Draft.as_str() }))
                .with_after(json!({ "status": EntryStatus::Posted.as_str() })),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(entry_id = %entry_id, entry_number = %entry.entry_number, "Draft posted");

        Ok(PostedEntry {
            entry,
            lines: stored,
            created: true,
        })
    }

    async fn write(
        &self,
        draft: &DraftEntry,
        header: EntryHeader,
    ) -> Result<PostedEntry, LedgerError> {
        validate_lines(&draft.lines)?;

        if let Some(key) = &draft.source
            && let Some(entry) = journal::find_active_by_key(&self.db, key).await?
        {
            debug!(source = %key, entry_id = %entry.id, "Source key already posted");
            return journal::existing(&self.db, entry).await;
        }

        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;
        match self.write_entry(&txn, draft, header).await? {
            WriteOutcome::Written(posted) => {
                txn.commit().await.ledger()?;
                info!(
                    entry_id = %posted.entry.id,
                    entry_number = %posted.entry.entry_number,
                    status = %EntryStatus::from(posted.entry.status),
                    "Journal entry written"
                );
                Ok(posted)
            }
            WriteOutcome::KeyConflict => {
                txn.rollback().await.ledger()?;
                self.resolve_conflict(draft).await
            }
        }
    }

    /// Re-reads the winner of a lost source key race.
    pub(crate) async fn resolve_conflict(
        &self,
        draft: &DraftEntry,
    ) -> Result<PostedEntry, LedgerError> {
        let Some(key) = &draft.source else {
            return Err(LedgerError::Busy(
                "entry number collision, retry the posting".to_string(),
            ));
        };
        match journal::find_active_by_key(&self.db, key).await? {
            Some(entry) => {
                debug!(source = %key, entry_id = %entry.id, "Lost source key race");
                journal::existing(&self.db, entry).await
            }
            None => Err(LedgerError::Busy(format!(
                "source key {key} changed state concurrently"
            ))),
        }
    }

    /// Shared write path. Runs inside the caller's transaction and never commits.
    pub(crate) async fn write_entry(
        &self,
        txn: &DatabaseTransaction,
        draft: &DraftEntry,
        header: EntryHeader,
    ) -> Result<WriteOutcome, LedgerError> {
        let locked = lock_accounts(txn, draft).await?;
        let plan = plan_against(draft, &locked)?;

        let number = match header.number {
            Some(number) => number,
            None => next_entry_number(txn, &self.config.entry_prefix, draft.entry_date).await?,
        };

        let entry_id = JournalEntryId::new();
        let now = Utc::now();
        let posted = header.status == EntryStatus::Posted;

        let inserted = journal_entries::ActiveModel {
            id: Set(entry_id.into_inner()),
            entry_number: Set(number),
            source_type: Set(draft.source.as_ref().map(|k| k.source_type.as_str().to_string())),
            source_id: Set(draft.source.as_ref().map(|k| k.source_id.clone())),
            entry_date: Set(draft.entry_date),
            description: Set(draft.description.clone()),
            status: Set(header.status.into()),
            total_debit: Set(plan.totals.total_debit.into()),
            total_credit: Set(plan.totals.total_credit.into()),
            reverses: Set(header.reverses.map(JournalEntryId::into_inner)),
            reversed_by: Set(None),
            posted_at: Set(posted.then(|| now.into())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(txn)
        .await;

        let entry = match inserted {
            Ok(entry) => entry,
            Err(err) if is_unique_violation(&err) => return Ok(WriteOutcome::KeyConflict),
            Err(err) => return Err(map_db_err(err)),
        };

        let lines = insert_lines(txn, entry_id, &plan).await?;

        let action = if posted {
            self.check_fail_point()?;
            apply_deltas(txn, &plan.deltas, &locked, entry_id, EventAction::Post).await?;
            EventAction::Post
        } else {
            EventAction::Create
        };

        event_log::append(
            txn,
            AuditEvent::new(EntityType::JournalEntry, entry.id, action).with_after(json!({
                "entry_number": entry.entry_number,
                "status": header.status.as_str(),
                "total": plan.totals.total_debit,
                "reverses": header.reverses,
            })),
        )
        .await?;

        Ok(WriteOutcome::Written(PostedEntry {
            entry,
            lines,
            created: true,
        }))
    }

    pub(crate) const fn config(&self) -> &PostingConfig {
        &self.config
    }

    pub(crate) const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) async fn begin(&self) -> Result<DatabaseTransaction, LedgerError> {
        begin_write(&self.db, self.config.lock_timeout_ms).await
    }

    fn check_fail_point(&self) -> Result<(), LedgerError> {
        match self.fail_point {
            Some(FailPoint::BeforeBalanceUpdate) => Err(LedgerError::Internal(
                "injected failure before balance update".to_string(),
            )),
            None => Ok(()),
        }
    }
}

/// Locks every account named by `draft`, ascending by id.
///
/// Accounts that do not exist are simply absent from the result; planning turns
/// them into `InvalidAccount`.
pub(crate) async fn lock_accounts(
    txn: &DatabaseTransaction,
    draft: &DraftEntry,
) -> Result<Vec<accounts::Model>, LedgerError> {
    let ids: BTreeSet<AccountId> = draft.lines.iter().map(|l| l.account_id).collect();
    let mut locked = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(account) = lock_account(txn, id).await? {
            locked.push(account);
        }
    }
    Ok(locked)
}

/// Locks one account row.
pub(crate) async fn lock_account(
    txn: &DatabaseTransaction,
    id: AccountId,
) -> Result<Option<accounts::Model>, LedgerError> {
    accounts::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .ledger()
}

pub(crate) fn account_info(model: &accounts::Model) -> AccountInfo {
    AccountInfo {
        id: AccountId::from_uuid(model.id),
        code: model.code.clone(),
        account_type: model.account_type.into(),
        is_active: model.is_active,
        is_header: model.is_header,
    }
}

fn plan_against(
    draft: &DraftEntry,
    locked: &[accounts::Model],
) -> Result<PostingPlan, LedgerError> {
    let infos: Vec<AccountInfo> = locked.iter().map(account_info).collect();
    PostingService::plan(draft, |id| PostingService::find_account(&infos, id))
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    entry_id: JournalEntryId,
    plan: &PostingPlan,
) -> Result<Vec<journal_lines::Model>, LedgerError> {
    let now = Utc::now();
    let mut lines = Vec::with_capacity(plan.lines.len());
    for line in &plan.lines {
        let model = journal_lines::ActiveModel {
            id: Set(JournalLineId::new().into_inner()),
            journal_id: Set(entry_id.into_inner()),
            line_number: Set(line.line_number),
            account_id: Set(line.account_id.into_inner()),
            debit_amount: Set(line.debit.into()),
            credit_amount: Set(line.credit.into()),
            description: Set(line.description.clone()),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await
        .ledger()?;
        lines.push(model);
    }
    Ok(lines)
}

/// Adds each delta to its locked account, then mirrors it into linked subsidiaries.
///
/// `locked` must hold every account named in `deltas`.
pub(crate) async fn apply_deltas(
    txn: &DatabaseTransaction,
    deltas: &[BalanceDelta],
    locked: &[accounts::Model],
    entry_id: JournalEntryId,
    action: EventAction,
) -> Result<(), LedgerError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    for delta in deltas.iter().filter(|d| !d.amount.is_zero()) {
        let before = locked
            .iter()
            .find(|a| a.id == delta.account_id.into_inner())
            .map(|a| a.balance)
            .ok_or_else(|| {
                LedgerError::Internal(format!("account {} was not locked", delta.account_id))
            })?;
        let after = before + delta.amount;

        // Computed under the row lock. SQL arithmetic on SQLite TEXT money goes through floats.
        accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(after))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(delta.account_id.into_inner()))
            .exec(txn)
            .await
            .ledger()?;

        event_log::append(
            txn,
            AuditEvent::new(EntityType::Account, delta.account_id.into_inner(), action)
                .with_before(json!({ "balance": before }))
                .with_after(json!({
                    "balance": after,
                    "journal_entry_id": entry_id,
                })),
        )
        .await?;
    }

    mirror_deltas(txn, deltas, entry_id, action).await
}

/// Applies account deltas to every active subsidiary linked to a touched account.
async fn mirror_deltas(
    txn: &DatabaseTransaction,
    deltas: &[BalanceDelta],
    entry_id: JournalEntryId,
    action: EventAction,
) -> Result<(), LedgerError> {
    let touched: Vec<_> = deltas
        .iter()
        .filter(|d| !d.amount.is_zero())
        .map(|d| d.account_id.into_inner())
        .collect();
    if touched.is_empty() {
        return Ok(());
    }

    let linked = subsidiary_ledgers::Entity::find()
        .filter(subsidiary_ledgers::Column::LinkedAccountId.is_in(touched))
        .filter(subsidiary_ledgers::Column::IsActive.eq(true))
        .order_by_asc(subsidiary_ledgers::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await
        .ledger()?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    for subsidiary in linked {
        let amount = deltas
            .iter()
            .find(|d| Some(d.account_id.into_inner()) == subsidiary.linked_account_id)
            .map_or(Decimal::ZERO, |d| d.amount);
        let after = subsidiary.balance + amount;

        subsidiary_ledgers::Entity::update_many()
            .col_expr(subsidiary_ledgers::Column::Balance, Expr::value(after))
            .col_expr(subsidiary_ledgers::Column::UpdatedAt, Expr::value(now))
            .filter(subsidiary_ledgers::Column::Id.eq(subsidiary.id))
            .exec(txn)
            .await
            .ledger()?;

        event_log::append(
            txn,
            AuditEvent::new(EntityType::Subsidiary, subsidiary.id, action)
                .with_before(json!({ "balance": subsidiary.balance }))
                .with_after(json!({
                    "balance": after,
                    "journal_entry_id": entry_id,
                })),
        )
        .await?;
    }
    Ok(())
}

/// Draws the next number for `prefix` in the period of `date`.
///
/// The counter row is locked until the transaction ends, which serialises
/// numbering per period without gaps from rolled-back postings.
async fn next_entry_number(
    txn: &DatabaseTransaction,
    prefix: &str,
    date: NaiveDate,
) -> Result<String, LedgerError> {
    let period = date.format("%Y%m").to_string();

    entry_sequences::Entity::insert(entry_sequences::ActiveModel {
        prefix: Set(prefix.to_string()),
        period: Set(period.clone()),
        next_value: Set(1),
    })
    .on_conflict(
        OnConflict::columns([entry_sequences::Column::Prefix, entry_sequences::Column::Period])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await
    .ledger()?;

    let counter = entry_sequences::Entity::find_by_id((prefix.to_string(), period.clone()))
        .lock_exclusive()
        .one(txn)
        .await
        .ledger()?
        .ok_or_else(|| LedgerError::Internal(format!("missing counter {prefix}/{period}")))?;

    entry_sequences::Entity::update_many()
        .col_expr(
            entry_sequences::Column::NextValue,
            Expr::col(entry_sequences::Column::NextValue).add(1),
        )
        .filter(entry_sequences::Column::Prefix.eq(prefix))
        .filter(entry_sequences::Column::Period.eq(period.as_str()))
        .exec(txn)
        .await
        .ledger()?;

    Ok(format_entry_number(prefix, &period, counter.next_value))
}

fn format_entry_number(prefix: &str, period: &str, value: i64) -> String {
    format!("{prefix}-{period}-{value:06}")
}
