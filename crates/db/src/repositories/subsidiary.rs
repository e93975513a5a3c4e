//! Subsidiary ledger repository.
//!
//! Links a subsidiary ledger to the GL account it mirrors. Balance mirroring on
//! posting lives in the posting path; this module owns the link itself.

use bukubesar_core::audit::{AuditEvent, EntityType, EventAction};
use bukubesar_core::ledger::{InvalidAccountReason, LedgerError};
use bukubesar_core::subsidiary::{LinkDecision, LinkRules, LinkState, SubsidiaryKind};
use bukubesar_shared::PostingConfig;
use bukubesar_shared::types::{AccountId, SubsidiaryId};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::json;
use tracing::{debug, info};

use super::error::{DbResultExt, is_unique_violation, map_db_err};
use super::posting::{account_info, lock_account};
use super::{begin_write, event_log};
use crate::entities::money::Money;
use crate::entities::subsidiary_ledgers;

/// Input for creating a subsidiary ledger.
#[derive(Debug, Clone)]
pub struct NewSubsidiary {
    /// Unique code (`KAS-KECIL`).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Kind, which fixes the account type it may link to.
    pub kind: SubsidiaryKind,
}

/// Subsidiary ledger repository.
#[derive(Debug, Clone)]
pub struct SubsidiaryRepository {
    db: DatabaseConnection,
    config: PostingConfig,
}

impl SubsidiaryRepository {
    /// Creates a new subsidiary repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: PostingConfig) -> Self {
        Self { db, config }
    }

    /// Creates an unlinked subsidiary ledger with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSubsidiaryCode` if the code is taken.
    pub async fn create(&self, input: NewSubsidiary) -> Result<subsidiary_ledgers::Model, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

        let now = Utc::now();
        let inserted = subsidiary_ledgers::ActiveModel {
            id: Set(SubsidiaryId::new().into_inner()),
            code: Set(input.code.clone()),
            name: Set(input.name.clone()),
            kind: Set(input.kind.into()),
            linked_account_id: Set(None),
            balance: Set(Money::ZERO),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await;

        let subsidiary = match inserted {
            Ok(subsidiary) => subsidiary,
            Err(err) if is_unique_violation(&err) => {
                return Err(LedgerError::DuplicateSubsidiaryCode(input.code));
            }
            Err(err) => return Err(map_db_err(err)),
        };

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::Subsidiary, subsidiary.id, EventAction::Create).with_after(
                json!({
                    "code": subsidiary.code,
                    "name": subsidiary.name,
                    "kind": input.kind.as_str(),
                }),
            ),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(subsidiary_id = %subsidiary.id, code = %subsidiary.code, "Subsidiary ledger created");

        Ok(subsidiary)
    }

    /// Links a subsidiary to a GL account and copies the account balance.
    ///
    /// Relinking a subsidiary to the account it already mirrors changes nothing.
    ///
    /// # Errors
    ///
    /// - `SubsidiaryNotFound` if the subsidiary does not exist
    /// - `InvalidAccount` if the account is missing, inactive, a header, or of a
    ///   type the subsidiary kind does not allow
    /// - `AlreadyLinked` if either side already belongs to another link
    pub async fn link(
        &self,
        subsidiary_id: SubsidiaryId,
        account_id: AccountId,
    ) -> Result<subsidiary_ledgers::Model, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

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

        LinkRules::validate_account(subsidiary.kind.into(), &account_info(&account))?;

        let holder = subsidiary_ledgers::Entity::find()
            .filter(subsidiary_ledgers::Column::LinkedAccountId.eq(account.id))
            .filter(subsidiary_ledgers::Column::IsActive.eq(true))
            .order_by_asc(subsidiary_ledgers::Column::Id)
            .one(&txn)
            .await
            .ledger()?;

        let decision = LinkRules::decide(
            LinkState {
                subsidiary_id,
                current_account: subsidiary.linked_account_id.map(AccountId::from_uuid),
                account_holder: holder.map(|h| SubsidiaryId::from_uuid(h.id)),
            },
            account_id,
        )?;

        if decision == LinkDecision::Unchanged {
            txn.rollback().await.ledger()?;
            debug!(subsidiary_id = %subsidiary_id, account_id = %account_id, "Link unchanged");
            return Ok(subsidiary);
        }

        let before = subsidiary.balance;
        let mut active: subsidiary_ledgers::ActiveModel = subsidiary.into();
        active.linked_account_id = Set(Some(account.id));
        active.balance = Set(account.balance);
        active.updated_at = Set(Utc::now().into());
        let subsidiary = active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::Subsidiary, subsidiary.id, EventAction::Link)
                .with_before(json!({ "linked_account_id": null, "balance": before }))
                .with_after(json!({
                    "linked_account_id": account.id,
                    "account_code": account.code,
                    "balance": subsidiary.balance,
                })),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(
            subsidiary_id = %subsidiary_id,
            account_code = %account.code,
            "Subsidiary ledger linked"
        );

        Ok(subsidiary)
    }

    /// Removes the link of a subsidiary. Its balance stops following the account.
    ///
    /// # Errors
    ///
    /// - `SubsidiaryNotFound` if the subsidiary does not exist
    /// - `NotLinked` if it has no linked account
    pub async fn unlink(
        &self,
        subsidiary_id: SubsidiaryId,
    ) -> Result<subsidiary_ledgers::Model, LedgerError> {
        let txn = begin_write(&self.db, self.config.lock_timeout_ms).await?;

        let subsidiary = subsidiary_ledgers::Entity::find_by_id(subsidiary_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::SubsidiaryNotFound(subsidiary_id))?;

        let Some(previous) = subsidiary.linked_account_id else {
            return Err(LedgerError::NotLinked(subsidiary_id));
        };

        let mut active: subsidiary_ledgers::ActiveModel = subsidiary.into();
        active.linked_account_id = Set(None);
        active.updated_at = Set(Utc::now().into());
        let subsidiary = active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::Subsidiary, subsidiary.id, EventAction::Unlink)
                .with_before(json!({ "linked_account_id": previous }))
                .with_after(json!({ "linked_account_id": null, "balance": subsidiary.balance })),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(subsidiary_id = %subsidiary_id, "Subsidiary ledger unlinked");

        Ok(subsidiary)
    }

    /// Gets a subsidiary ledger by id.
    ///
    /// # Errors
    ///
    /// Returns `SubsidiaryNotFound` if it does not exist.
    pub async fn get(&self, id: SubsidiaryId) -> Result<subsidiary_ledgers::Model, LedgerError> {
        subsidiary_ledgers::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .ledger()?
            .ok_or(LedgerError::SubsidiaryNotFound(id))
    }

    /// Finds a subsidiary ledger by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<subsidiary_ledgers::Model>, LedgerError> {
        subsidiary_ledgers::Entity::find()
            .filter(subsidiary_ledgers::Column::Code.eq(code))
            .one(&self.db)
            .await
            .ledger()
    }

    /// Lists subsidiary ledgers ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<subsidiary_ledgers::Model>, LedgerError> {
        subsidiary_ledgers::Entity::find()
            .order_by_asc(subsidiary_ledgers::Column::Code)
            .all(&self.db)
            .await
            .ledger()
    }
}
