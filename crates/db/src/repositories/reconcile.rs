//! Balance reconciliation repository.
//!
//! Detection only reads and reports. Healing is a separate, logged write that
//! takes the same row locks as posting.

use std::collections::HashMap;

use bukubesar_core::audit::{AuditEvent, EntityType, EventAction};
use bukubesar_core::ledger::{InvalidAccountReason, LedgerError};
use bukubesar_core::reconcile::{
    AccountSnapshot, BalanceReconciler, Discrepancy, LineSums, SubsidiaryDiscrepancy,
};
use bukubesar_shared::PostingConfig;
use bukubesar_shared::types::{AccountId, SubsidiaryId};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::DbResultExt;
use super::posting::lock_account;
use super::{begin_read, begin_write, event_log};
use crate::entities::money::Money;
use crate::entities::{
    accounts, journal_entries, journal_lines, sea_orm_active_enums::EntryStatus,
    subsidiary_ledgers,
};

const HEAL_REASON: &str = "balance healed from journal lines";

#[derive(Debug, FromQueryResult)]
struct LineSumRow {
    account_id: Uuid,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
}

#[derive(Debug, FromQueryResult)]
struct LineAmountRow {
    account_id: Uuid,
    debit_amount: Money,
    credit_amount: Money,
}

/// Debit and credit sums of balance-affecting lines, per account.
async fn line_sums<C>(
    db: &C,
    account: Option<Uuid>,
) -> Result<HashMap<Uuid, LineSums>, LedgerError>
where
    C: ConnectionTrait,
{
    let mut query = journal_lines::Entity::find()
        .select_only()
        .column(journal_lines::Column::AccountId)
        .inner_join(journal_entries::Entity)
        .filter(journal_entries::Column::Status.is_in([EntryStatus::Posted, EntryStatus::Reversed]));

    if let Some(id) = account {
        query = query.filter(journal_lines::Column::AccountId.eq(id));
    }

    // SQLite would SUM the TEXT amounts as floats
    if db.get_database_backend() == DbBackend::Sqlite {
        let rows = query
            .column(journal_lines::Column::DebitAmount)
            .column(journal_lines::Column::CreditAmount)
            .into_model::<LineAmountRow>()
            .all(db)
            .await
            .ledger()?;

        let mut sums: HashMap<Uuid, LineSums> = HashMap::new();
        for row in rows {
            let sum = sums.entry(row.account_id).or_default();
            sum.debit += row.debit_amount.amount();
            sum.credit += row.credit_amount.amount();
        }
        return Ok(sums);
    }

    let rows = query
        .column_as(journal_lines::Column::DebitAmount.sum(), "debit")
        .column_as(journal_lines::Column::CreditAmount.sum(), "credit")
        .group_by(journal_lines::Column::AccountId)
        .into_model::<LineSumRow>()
        .all(db)
        .await
        .ledger()?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.account_id,
                LineSums {
                    debit: row.debit.unwrap_or_default(),
                    credit: row.credit.unwrap_or_default(),
                },
            )
        })
        .collect())
}

fn snapshot(account: &accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        account_id: AccountId::from_uuid(account.id),
        code: account.code.clone(),
        account_type: account.account_type.into(),
        cached: account.balance.amount(),
    }
}

/// Balance reconciliation repository.
#[derive(Debug, Clone)]
pub struct ReconcileRepository {
    db: DatabaseConnection,
    config: PostingConfig,
}

impl ReconcileRepository {
    /// Creates a new reconcile repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: PostingConfig) -> Self {
        Self { db, config }
    }

    /// Compares cached balances with line sums. `None` checks every account.
    ///
    /// Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` with reason `Missing` for an unknown account.
    pub async fn reconcile(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Discrepancy>, LedgerError> {
        let txn = begin_read(&self.db).await?;

        let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Code);
        if let Some(id) = account_id {
            query = query.filter(accounts::Column::Id.eq(id.into_inner()));
        }
        let accounts = query.all(&txn).await.ledger()?;

        if let Some(id) = account_id
            && accounts.is_empty()
        {
            return Err(LedgerError::invalid_account(id, InvalidAccountReason::Missing));
        }

        let sums = line_sums(&txn, account_id.map(AccountId::into_inner)).await?;
        txn.commit().await.ledger()?;

        let discrepancies: Vec<Discrepancy> = accounts
            .iter()
            .filter_map(|account| {
                let sums = sums.get(&account.id).copied().unwrap_or_default();
                BalanceReconciler::compare(&snapshot(account), sums)
            })
            .collect();

        for d in &discrepancies {
            warn!(
                account_id = %d.account_id,
                code = %d.code,
                cached = %d.cached,
                calculated = %d.calculated,
                delta = %d.delta,
                "Balance discrepancy"
            );
        }

        Ok(discrepancies)
    }

    /// Sets an account's balance to its calculated value and re-mirrors it into
    /// the linked subsidiary. Returns the corrected discrepancy, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` with reason `Missing` for an unknown account.
    pub async fn heal(&self, account_id: AccountId) -> Result<Option<Discrepancy>, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

        let account = lock_account(&txn, account_id)
            .await?
            .ok_or(LedgerError::invalid_account(
                account_id,
                InvalidAccountReason::Missing,
            ))?;

        let sums = line_sums(&txn, Some(account.id))
            .await?
            .remove(&account.id)
            .unwrap_or_default();

        let Some(discrepancy) = BalanceReconciler::compare(&snapshot(&account), sums) else {
            txn.rollback().await.ledger()?;
            return Ok(None);
        };

        let mut active: accounts::ActiveModel = account.into();
        active.balance = Set(discrepancy.calculated.into());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::balance_change(
                EntityType::Account,
                account_id.into_inner(),
                EventAction::Reconcile,
                discrepancy.cached,
                discrepancy.calculated,
            )
            .with_reason(HEAL_REASON),
        )
        .await?;

        let linked = subsidiary_ledgers::Entity::find()
            .filter(subsidiary_ledgers::Column::LinkedAccountId.eq(account_id.into_inner()))
            .filter(subsidiary_ledgers::Column::IsActive.eq(true))
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?;
        if let Some(subsidiary) = linked {
            set_subsidiary_balance(&txn, subsidiary, discrepancy.calculated).await?;
        }

        txn.commit().await.ledger()?;

        info!(
            account_id = %account_id,
            code = %discrepancy.code,
            from = %discrepancy.cached,
            to = %discrepancy.calculated,
            "Account balance healed"
        );

        Ok(Some(discrepancy))
    }

    /// Compares every active linked subsidiary with its account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn reconcile_subsidiaries(&self) -> Result<Vec<SubsidiaryDiscrepancy>, LedgerError> {
        let txn = begin_read(&self.db).await?;

        let linked = subsidiary_ledgers::Entity::find()
            .filter(subsidiary_ledgers::Column::LinkedAccountId.is_not_null())
            .filter(subsidiary_ledgers::Column::IsActive.eq(true))
            .order_by_asc(subsidiary_ledgers::Column::Code)
            .all(&txn)
            .await
            .ledger()?;

        let account_ids: Vec<Uuid> = linked.iter().filter_map(|s| s.linked_account_id).collect();
        let balances: HashMap<Uuid, Decimal> = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(account_ids))
            .all(&txn)
            .await
            .ledger()?
            .into_iter()
            .map(|a| (a.id, a.balance.amount()))
            .collect();

        txn.commit().await.ledger()?;

        let discrepancies: Vec<SubsidiaryDiscrepancy> = linked
            .iter()
            .filter_map(|s| {
                let account = s.linked_account_id?;
                BalanceReconciler::compare_subsidiary(
                    SubsidiaryId::from_uuid(s.id),
                    &s.code,
                    AccountId::from_uuid(account),
                    s.balance.amount(),
                    balances.get(&account).copied().unwrap_or_default(),
                )
            })
            .collect();

        for d in &discrepancies {
            warn!(
                subsidiary_id = %d.subsidiary_id,
                code = %d.code,
                subsidiary_balance = %d.subsidiary_balance,
                account_balance = %d.account_balance,
                "Subsidiary discrepancy"
            );
        }

        Ok(discrepancies)
    }

    /// Sets a subsidiary's balance to its linked account balance.
    ///
    /// # Errors
    ///
    /// - `SubsidiaryNotFound` if the subsidiary does not exist
    /// - `NotLinked` if it has no linked account
    pub async fn heal_subsidiary(
        &self,
        subsidiary_id: SubsidiaryId,
    ) -> Result<Option<SubsidiaryDiscrepancy>, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

        let current = subsidiary_ledgers::Entity::find_by_id(subsidiary_id.into_inner())
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::SubsidiaryNotFound(subsidiary_id))?;
        let account_id = current
            .linked_account_id
            .map(AccountId::from_uuid)
            .ok_or(LedgerError::NotLinked(subsidiary_id))?;

        // Account before subsidiary, as in posting
        let account = lock_account(&txn, account_id)
            .await?
            .ok_or(LedgerError::invalid_account(
                account_id,
                InvalidAccountReason::Missing,
            ))?;
        let subsidiary = subsidiary_ledgers::Entity::find_by_id(subsidiary_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::SubsidiaryNotFound(subsidiary_id))?;
        if subsidiary.linked_account_id != Some(account.id) {
            return Err(LedgerError::Busy(format!(
                "link of subsidiary {subsidiary_id} changed concurrently"
            )));
        }

        let Some(discrepancy) = BalanceReconciler::compare_subsidiary(
            subsidiary_id,
            &subsidiary.code,
            account_id,
            subsidiary.balance.amount(),
            account.balance.amount(),
        ) else {
            txn.rollback().await.ledger()?;
            return Ok(None);
        };

        set_subsidiary_balance(&txn, subsidiary, account.balance.amount()).await?;
        txn.commit().await.ledger()?;

        info!(
            subsidiary_id = %subsidiary_id,
            from = %discrepancy.subsidiary_balance,
            to = %discrepancy.account_balance,
            "Subsidiary balance healed"
        );

        Ok(Some(discrepancy))
    }
}

async fn set_subsidiary_balance<C>(
    db: &C,
    subsidiary: subsidiary_ledgers::Model,
    balance: Decimal,
) -> Result<(), LedgerError>
where
    C: ConnectionTrait,
{
    let before = subsidiary.balance.amount();
    let id = subsidiary.id;

    let mut active: subsidiary_ledgers::ActiveModel = subsidiary.into();
    active.balance = Set(balance.into());
    active.updated_at = Set(Utc::now().into());
    active.update(db).await.ledger()?;

    event_log::append(
        db,
        AuditEvent::balance_change(
            EntityType::Subsidiary,
            id,
            EventAction::Reconcile,
            before,
            balance,
        )
        .with_reason(HEAL_REASON),
    )
    .await?;
    Ok(())
}
