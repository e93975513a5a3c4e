//! Ledger error types for validation and state errors.
//!
//! This module defines all errors that can occur during ledger operations:
//! entry validation, account checks, entry state, subsidiary links and
//! lock contention.

use std::fmt;

use bukubesar_shared::types::{AccountId, JournalEntryId, SubsidiaryId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{AccountType, EntryStatus};

/// Why an account cannot be used for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidAccountReason {
    /// No account with that id exists.
    Missing,
    /// The account is deactivated.
    Inactive,
    /// Header accounts aggregate children and never receive lines.
    Header,
    /// The account type does not fit the operation.
    TypeNotAllowed(AccountType),
}

impl fmt::Display for InvalidAccountReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("does not exist"),
            Self::Inactive => f.write_str("is inactive"),
            Self::Header => f.write_str("is a header account"),
            Self::TypeNotAllowed(t) => write!(f, "has type {t} which is not allowed here"),
        }
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry has no lines.
    #[error("Journal entry must have at least one line")]
    EmptyEntry,

    /// Entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line has neither a debit nor a credit amount.
    #[error("Line {line} has no amount")]
    ZeroAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount cannot be negative.
    #[error("Line {line} has a negative amount")]
    NegativeAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line must specify either debit or credit, not both.
    #[error("Line {line} must specify either debit or credit, not both")]
    InvalidEntryType {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount or running entry total does not fit 16 integer digits and
    /// 4 decimal places.
    #[error("Line {line} has amount {amount} outside 16 integer digits and 4 decimal places")]
    AmountOutOfRange {
        /// 1-based line number.
        line: usize,
        /// The amount or running total that does not fit.
        amount: Decimal,
    },

    /// Reversal requested without a reason.
    #[error("A reason is required to reverse a journal entry")]
    ReasonRequired,

    // ========== Account Errors ==========
    /// Account cannot be used.
    #[error("Account {account} {reason}")]
    InvalidAccount {
        /// The offending account.
        account: AccountId,
        /// What is wrong with it.
        reason: InvalidAccountReason,
    },

    /// No account carries the given code.
    #[error("Account code not found: {0}")]
    AccountCodeNotFound(String),

    /// Another account already uses the code.
    #[error("Account code already exists: {0}")]
    DuplicateAccountCode(String),

    /// The requested parent cannot hold the account.
    #[error("Invalid parent account {code}: {reason}")]
    InvalidParent {
        /// Parent account code.
        code: String,
        /// Explanation.
        reason: String,
    },

    // ========== Entry State Errors ==========
    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Operation does not apply to the entry's current status.
    #[error("Journal entry {entry} is {status}, expected {expected}")]
    InvalidState {
        /// The entry.
        entry: JournalEntryId,
        /// Its current status.
        status: EntryStatus,
        /// The status the operation requires.
        expected: EntryStatus,
    },

    /// Reversal entries are final; post a new entry instead.
    #[error("Journal entry {0} is itself a reversal and cannot be reversed")]
    CannotReverseReversal(JournalEntryId),

    // ========== Subsidiary Errors ==========
    /// Subsidiary ledger not found.
    #[error("Subsidiary ledger not found: {0}")]
    SubsidiaryNotFound(SubsidiaryId),

    /// Subsidiary code already exists.
    #[error("Subsidiary code already exists: {0}")]
    DuplicateSubsidiaryCode(String),

    /// The account or the subsidiary is already part of another link.
    #[error("Account {account} is already linked to subsidiary {subsidiary}")]
    AlreadyLinked {
        /// The GL account.
        account: AccountId,
        /// The subsidiary currently holding the link.
        subsidiary: SubsidiaryId,
    },

    /// Subsidiary has no linked account.
    #[error("Subsidiary ledger {0} is not linked to an account")]
    NotLinked(SubsidiaryId),

    // ========== Concurrency Errors ==========
    /// Lock wait, deadlock or pool exhaustion. Safe to retry.
    #[error("Ledger is busy, please retry: {0}")]
    Busy(String),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::InvalidAccount`].
    #[must_use]
    pub const fn invalid_account(account: AccountId, reason: InvalidAccountReason) -> Self {
        Self::InvalidAccount { account, reason }
    }

    /// Returns a stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry => "EMPTY_ENTRY",
            Self::Unbalanced { .. } => "UNBALANCED",
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::InvalidEntryType { .. } => "INVALID_ENTRY_TYPE",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::InvalidAccount { .. } => "INVALID_ACCOUNT",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::InvalidParent { .. } => "INVALID_PARENT",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::SubsidiaryNotFound(_) => "SUBSIDIARY_NOT_FOUND",
            Self::DuplicateSubsidiaryCode(_) => "DUPLICATE_SUBSIDIARY_CODE",
            Self::AlreadyLinked { .. } => "ALREADY_LINKED",
            Self::NotLinked(_) => "NOT_LINKED",
            Self::Busy(_) => "BUSY",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Returns true if the request was rejected before anything was written.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyEntry
                | Self::Unbalanced { .. }
                | Self::ZeroAmount { .. }
                | Self::NegativeAmount { .. }
                | Self::InvalidEntryType { .. }
                | Self::AmountOutOfRange { .. }
                | Self::ReasonRequired
                | Self::InvalidAccount { .. }
                | Self::InvalidParent { .. }
        )
    }
}
