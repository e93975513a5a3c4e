//! Posting service for journal validation and planning.
//!
//! This module provides the core business logic for validating a draft entry
//! and computing the balance deltas it implies, before anything is persisted.

use bukubesar_shared::types::{AccountId, JournalEntryId};
use rust_decimal::Decimal;

use super::balance::{self, BalanceDelta};
use super::error::{InvalidAccountReason, LedgerError};
use super::types::{AccountType, DraftEntry, EntryStatus, EntryTotals};
use super::validation::validate_lines;

/// Information about an account needed for validation.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Business code (`1101`).
    pub code: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether the account is a header (aggregate-only) account.
    pub is_header: bool,
}

impl AccountInfo {
    /// Checks that lines may be posted against this account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` for inactive or header accounts.
    pub fn ensure_postable(&self) -> Result<(), LedgerError> {
        if !self.is_active {
            return Err(LedgerError::invalid_account(
                self.id,
                InvalidAccountReason::Inactive,
            ));
        }
        if self.is_header {
            return Err(LedgerError::invalid_account(
                self.id,
                InvalidAccountReason::Header,
            ));
        }
        Ok(())
    }
}

/// A validated line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// 1-based position within the entry.
    pub line_number: i32,
    /// Target account.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

/// Everything the store needs to commit an entry.
#[derive(Debug, Clone)]
pub struct PostingPlan {
    /// Validated lines in submission order.
    pub lines: Vec<ResolvedLine>,
    /// Entry totals (always balanced).
    pub totals: EntryTotals,
    /// One delta per distinct account, ascending by account id.
    pub deltas: Vec<BalanceDelta>,
}

impl PostingPlan {
    /// Accounts touched by the plan, in lock order.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        balance::lock_order(&self.deltas)
    }
}

/// Posting service for journal validation and planning.
///
/// This service contains pure business logic with no database dependencies.
/// The store locks the accounts first, then asks for a plan against the locked rows.
pub struct PostingService;

impl PostingService {
    /// Validate a draft entry and compute its balance deltas.
    ///
    /// 1. Validates line shape and exact balance
    /// 2. Validates accounts (exist, active, not header)
    /// 3. Signs each line by its account's normal side and nets per account
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails. Nothing has been written at
    /// that point.
    pub fn plan<A>(draft: &DraftEntry, account_lookup: A) -> Result<PostingPlan, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let totals = validate_lines(&draft.lines)?;

        let mut lines = Vec::with_capacity(draft.lines.len());
        let mut signed = Vec::with_capacity(draft.lines.len());

        for (index, line) in draft.lines.iter().enumerate() {
            let account = account_lookup(line.account_id)?;
            account.ensure_postable()?;

            signed.push((
                line.account_id,
                account.account_type.normal_balance(),
                line.debit,
                line.credit,
            ));
            lines.push(ResolvedLine {
                line_number: i32::try_from(index + 1)
                    .map_err(|_| LedgerError::Internal("too many lines".to_string()))?,
                account_id: line.account_id,
                debit: line.debit,
                credit: line.credit,
                description: line.description.clone(),
            });
        }

        Ok(PostingPlan {
            lines,
            totals,
            deltas: balance::net_deltas(signed),
        })
    }

    /// Lookup helper for a pre-fetched account list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` with reason `Missing` when `id` is absent.
    pub fn find_account(accounts: &[AccountInfo], id: AccountId) -> Result<AccountInfo, LedgerError> {
        accounts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(LedgerError::invalid_account(id, InvalidAccountReason::Missing))
    }

    /// Validate that a stored draft can be posted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the entry is a draft.
    pub fn validate_can_post(entry: JournalEntryId, status: EntryStatus) -> Result<(), LedgerError> {
        if status != EntryStatus::Draft {
            return Err(LedgerError::InvalidState {
                entry,
                status,
                expected: EntryStatus::Draft,
            });
        }
        Ok(())
    }
}
