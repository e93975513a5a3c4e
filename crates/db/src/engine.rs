//! Ledger engine facade.
//!
//! Bundles the repositories behind one handle built from an injected connection.

use bukubesar_core::ledger::{DraftEntry, LedgerError};
use bukubesar_core::reconcile::{Discrepancy, SubsidiaryDiscrepancy};
use bukubesar_core::reversal::Reversibility;
use bukubesar_shared::types::{AccountId, JournalEntryId, SubsidiaryId};
use bukubesar_shared::{AppConfig, PostingConfig};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr};

use crate::entities::subsidiary_ledgers;
use crate::repositories::{
    AccountRepository, EventLogRepository, FailPoint, JournalRepository, PostedEntry,
    PostingRepository, ReconcileRepository, ReversalRepository, SubsidiaryRepository,
};

/// Entry point for every ledger operation.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    db: DatabaseConnection,
    accounts: AccountRepository,
    journal: JournalRepository,
    posting: PostingRepository,
    reversal: ReversalRepository,
    reconcile: ReconcileRepository,
    subsidiaries: SubsidiaryRepository,
    events: EventLogRepository,
}

impl LedgerEngine {
    /// Creates an engine over an existing connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: PostingConfig) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            journal: JournalRepository::new(db.clone()),
            posting: PostingRepository::new(db.clone(), config.clone()),
            reversal: ReversalRepository::new(db.clone(), config.clone()),
            reconcile: ReconcileRepository::new(db.clone(), config.clone()),
            subsidiaries: SubsidiaryRepository::new(db.clone(), config),
            events: EventLogRepository::new(db.clone()),
            db,
        }
    }

    /// Connects using application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(config: &AppConfig) -> Result<Self, DbErr> {
        let db = crate::connect(&config.database).await?;
        Ok(Self::new(db, config.posting.clone()))
    }

    #[doc(hidden)]
    #[must_use]
    pub fn with_fail_point(mut self, fail_point: FailPoint) -> Self {
        self.posting = self.posting.with_fail_point(fail_point);
        self
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Chart of accounts operations.
    #[must_use]
    pub const fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    /// Journal lookups.
    #[must_use]
    pub const fn journal(&self) -> &JournalRepository {
        &self.journal
    }

    /// Draft and posting operations.
    #[must_use]
    pub const fn posting(&self) -> &PostingRepository {
        &self.posting
    }

    /// Subsidiary ledger operations.
    #[must_use]
    pub const fn subsidiaries(&self) -> &SubsidiaryRepository {
        &self.subsidiaries
    }

    /// Reconciliation and healing.
    #[must_use]
    pub const fn reconciler(&self) -> &ReconcileRepository {
        &self.reconcile
    }

    /// Event history.
    #[must_use]
    pub const fn events(&self) -> &EventLogRepository {
        &self.events
    }

    /// Posts a balanced entry. Idempotent per source key.
    ///
    /// # Errors
    ///
    /// See [`PostingRepository::post`].
    pub async fn post(&self, draft: &DraftEntry) -> Result<PostedEntry, LedgerError> {
        self.posting.post(draft).await
    }

    /// Reverses a posted entry as of today.
    ///
    /// # Errors
    ///
    /// See [`ReversalRepository::reverse_dated`].
    pub async fn reverse(
        &self,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> Result<PostedEntry, LedgerError> {
        self.reversal.reverse(entry_id, reason).await
    }

    /// Reverses a posted entry with an explicit accounting date.
    ///
    /// # Errors
    ///
    /// See [`ReversalRepository::reverse_dated`].
    pub async fn reverse_dated(
        &self,
        entry_id: JournalEntryId,
        reason: &str,
        date: chrono::NaiveDate,
    ) -> Result<PostedEntry, LedgerError> {
        self.reversal.reverse_dated(entry_id, reason, date).await
    }

    /// Whether an entry can be reversed, with an explanation.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the entry does not exist.
    pub async fn can_reverse(&self, entry_id: JournalEntryId) -> Result<Reversibility, LedgerError> {
        self.reversal.can_reverse(entry_id).await
    }

    /// Balance of an account by code. Headers roll up their children.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` for an unknown code.
    pub async fn get_balance(&self, code: &str) -> Result<Decimal, LedgerError> {
        self.accounts.get_balance(code).await
    }

    /// Reports drift for one account, or all accounts when `None`.
    ///
    /// # Errors
    ///
    /// See [`ReconcileRepository::reconcile`].
    pub async fn reconcile(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Discrepancy>, LedgerError> {
        self.reconcile.reconcile(account_id).await
    }

    /// Corrects one account's cached balance from its lines.
    ///
    /// # Errors
    ///
    /// See [`ReconcileRepository::heal`].
    pub async fn heal(&self, account_id: AccountId) -> Result<Option<Discrepancy>, LedgerError> {
        self.reconcile.heal(account_id).await
    }

    /// Reports subsidiaries whose balance differs from their account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn reconcile_subsidiaries(&self) -> Result<Vec<SubsidiaryDiscrepancy>, LedgerError> {
        self.reconcile.reconcile_subsidiaries().await
    }

    /// Links a subsidiary ledger to an account.
    ///
    /// # Errors
    ///
    /// See [`SubsidiaryRepository::link`].
    pub async fn link_subsidiary(
        &self,
        subsidiary_id: SubsidiaryId,
        account_id: AccountId,
    ) -> Result<subsidiary_ledgers::Model, LedgerError> {
        self.subsidiaries.link(subsidiary_id, account_id).await
    }
}
