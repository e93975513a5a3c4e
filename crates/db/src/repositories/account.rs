//! Account repository for chart of accounts operations.

use bukubesar_core::audit::{AuditEvent, EntityType, EventAction};
use bukubesar_core::ledger::{
    AccountNode, AccountType, HierarchyService, InvalidAccountReason, LedgerError,
};
use bukubesar_shared::types::AccountId;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::error::{DbResultExt, is_unique_violation, map_db_err};
use super::event_log;
use crate::entities::accounts;
use crate::entities::money::Money;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Unique business code (`1101`).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Code of the header account this account rolls up into.
    pub parent_code: Option<String>,
    /// Header accounts aggregate children and never receive lines.
    pub is_header: bool,
}

impl NewAccount {
    /// A postable top-level account.
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_code: None,
            is_header: false,
        }
    }

    /// Marks the account as a header.
    #[must_use]
    pub fn header(mut self) -> Self {
        self.is_header = true;
        self
    }

    /// Places the account under a header.
    #[must_use]
    pub fn under(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }
}

/// Reported balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Business code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the balance is a roll-up of child accounts.
    pub is_header: bool,
    /// Cached balance, or the roll-up for headers.
    pub balance: Decimal,
}

fn node(model: &accounts::Model) -> AccountNode {
    AccountNode {
        id: AccountId::from_uuid(model.id),
        parent_id: model.parent_id.map(AccountId::from_uuid),
        account_type: model.account_type.into(),
        is_header: model.is_header,
        balance: model.balance.amount(),
    }
}

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with a zero balance.
    ///
    /// # Errors
    ///
    /// - `DuplicateAccountCode` if the code is taken
    /// - `AccountCodeNotFound` if the parent code does not exist
    /// - `InvalidParent` if the parent is not an active header of the same type
    pub async fn create_account(&self, input: NewAccount) -> Result<accounts::Model, LedgerError> {
        let txn = self.db.begin().await.ledger()?;

        let taken = accounts::Entity::find()
            .filter(accounts::Column::Code.eq(input.code.as_str()))
            .one(&txn)
            .await
            .ledger()?;
        if taken.is_some() {
            return Err(LedgerError::DuplicateAccountCode(input.code));
        }

        let parent_id = match &input.parent_code {
            Some(parent_code) => {
                let parent = accounts::Entity::find()
                    .filter(accounts::Column::Code.eq(parent_code.as_str()))
                    .one(&txn)
                    .await
                    .ledger()?
                    .ok_or_else(|| LedgerError::AccountCodeNotFound(parent_code.clone()))?;
                HierarchyService::validate_parent(
                    parent_code,
                    &node(&parent),
                    parent.is_active,
                    input.account_type,
                )?;
                Some(parent.id)
            }
            None => None,
        };

        let now = Utc::now();
        let inserted = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            code: Set(input.code.clone()),
            name: Set(input.name.clone()),
            account_type: Set(input.account_type.into()),
            parent_id: Set(parent_id),
            is_header: Set(input.is_header),
            is_active: Set(true),
            balance: Set(Money::ZERO),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await;

        let account = match inserted {
            Ok(account) => account,
            Err(err) if is_unique_violation(&err) => {
                return Err(LedgerError::DuplicateAccountCode(input.code));
            }
            Err(err) => return Err(map_db_err(err)),
        };

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::Account, account.id, EventAction::Create).with_after(
                json!({
                    "code": account.code,
                    "name": account.name,
                    "account_type": input.account_type.as_str(),
                    "parent_code": input.parent_code,
                    "is_header": account.is_header,
                }),
            ),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(account_id = %account.id, code = %account.code, "Account created");

        Ok(account)
    }

    /// Deactivates an account so it can no longer receive lines.
    ///
    /// Deactivating an inactive account changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` with reason `Missing` if the account does not exist.
    pub async fn deactivate(&self, account_id: AccountId) -> Result<accounts::Model, LedgerError> {
        let txn = self.db.begin().await.ledger()?;

        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .ledger()?
            .ok_or(LedgerError::invalid_account(
                account_id,
                InvalidAccountReason::Missing,
            ))?;

        if !account.is_active {
            txn.rollback().await.ledger()?;
            return Ok(account);
        }

        let mut active: accounts::ActiveModel = account.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        let account = active.update(&txn).await.ledger()?;

        event_log::append(
            &txn,
            AuditEvent::new(EntityType::Account, account.id, EventAction::Deactivate)
                .with_before(json!({ "is_active": true }))
                .with_after(json!({ "is_active": false, "balance": account.balance })),
        )
        .await?;

        txn.commit().await.ledger()?;

        info!(account_id = %account.id, code = %account.code, "Account deactivated");

        Ok(account)
    }

    /// Finds an account by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<accounts::Model>, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::Code.eq(code))
            .one(&self.db)
            .await
            .ledger()
    }

    /// Finds an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<accounts::Model>, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .ledger()
    }

    /// Lists all accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<accounts::Model>, LedgerError> {
        accounts::Entity::find()
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
            .ledger()
    }

    /// Balance of the account with `code`.
    ///
    /// Header accounts report the sum of their non-header descendants.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` if no account has this code.
    pub async fn get_balance(&self, code: &str) -> Result<Decimal, LedgerError> {
        let account = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::AccountCodeNotFound(code.to_string()))?;

        if !account.is_header {
            return Ok(account.balance.amount());
        }

        // Children always share the header's type
        let family = accounts::Entity::find()
            .filter(accounts::Column::AccountType.eq(account.account_type))
            .all(&self.db)
            .await
            .ledger()?;
        let nodes: Vec<AccountNode> = family.iter().map(node).collect();

        Ok(HierarchyService::rollup(
            AccountId::from_uuid(account.id),
            &nodes,
        ))
    }

    /// Reported balances of every account, headers rolled up.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn balances(&self) -> Result<Vec<AccountBalance>, LedgerError> {
        let all = self.list().await?;
        let nodes: Vec<AccountNode> = all.iter().map(node).collect();

        Ok(all
            .into_iter()
            .map(|account| {
                let account_id = AccountId::from_uuid(account.id);
                let balance = if account.is_header {
                    HierarchyService::rollup(account_id, &nodes)
                } else {
                    account.balance.amount()
                };
                AccountBalance {
                    account_id,
                    code: account.code,
                    name: account.name,
                    account_type: account.account_type.into(),
                    is_header: account.is_header,
                    balance,
                }
            })
            .collect())
    }
}

