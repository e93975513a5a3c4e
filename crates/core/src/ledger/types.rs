//! Ledger domain types for journal creation and validation.
//!
//! This module defines the core types used for creating and validating
//! journal entries in the double-entry bookkeeping system.

use std::fmt;
use std::str::FromStr;

use bukubesar_shared::types::{AccountId, JournalEntryId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::NormalBalance;

/// Chart of accounts classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned (cash, bank, receivables).
    Asset,
    /// Obligations owed (payables, loans).
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// All account types in chart order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the side on which this account type grows.
    ///
    /// - Asset/Expense: debit-normal
    /// - Liability/Equity/Revenue: credit-normal
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns the lowercase storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// Journal entry status.
///
/// Entries are created as drafts or posted directly. Only the reversal path
/// moves a posted entry to `Reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Saved without balance effect.
    Draft,
    /// Applied to account balances (immutable).
    Posted,
    /// Compensated by a reversing entry (immutable).
    Reversed,
}

impl EntryStatus {
    /// Returns true if the entry still holds its source key.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Reversed)
    }

    /// Returns true if the entry's lines count towards account balances.
    ///
    /// A reversed entry keeps contributing; its reversal cancels it out.
    #[must_use]
    pub const fn affects_balance(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Returns the lowercase storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream module that produced a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Sales invoice.
    Sale,
    /// Purchase invoice.
    Purchase,
    /// Incoming or outgoing payment.
    Payment,
    /// Cash or bank movement.
    CashBank,
    /// Fixed asset acquisition or disposal.
    Asset,
    /// Manually keyed journal.
    Manual,
    /// Opening balance.
    Opening,
    /// Period closing.
    Closing,
    /// Adjustment entry.
    Adjustment,
    /// Transfer between accounts.
    Transfer,
    /// Depreciation run.
    Depreciation,
    /// Compensating entry for a posted journal.
    Reversal,
}

impl SourceType {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
            Self::Payment => "PAYMENT",
            Self::CashBank => "CASH_BANK",
            Self::Asset => "ASSET",
            Self::Manual => "MANUAL",
            Self::Opening => "OPENING",
            Self::Closing => "CLOSING",
            Self::Adjustment => "ADJUSTMENT",
            Self::Transfer => "TRANSFER",
            Self::Depreciation => "DEPRECIATION",
            Self::Reversal => "REVERSAL",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SALE" => Ok(Self::Sale),
            "PURCHASE" => Ok(Self::Purchase),
            "PAYMENT" => Ok(Self::Payment),
            "CASH_BANK" => Ok(Self::CashBank),
            "ASSET" => Ok(Self::Asset),
            "MANUAL" => Ok(Self::Manual),
            "OPENING" => Ok(Self::Opening),
            "CLOSING" => Ok(Self::Closing),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            "TRANSFER" => Ok(Self::Transfer),
            "DEPRECIATION" => Ok(Self::Depreciation),
            "REVERSAL" => Ok(Self::Reversal),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Idempotency key of an upstream event: at most one active entry per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    /// Producing module.
    pub source_type: SourceType,
    /// Identifier of the upstream document.
    pub source_id: String,
}

impl SourceKey {
    /// Creates a key for an upstream document.
    pub fn new(source_type: SourceType, source_id: impl Into<String>) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
        }
    }

    /// Key carried by the reversal of `entry`.
    #[must_use]
    pub fn reversal_of(entry: JournalEntryId) -> Self {
        Self::new(SourceType::Reversal, entry.to_string())
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.source_type, self.source_id)
    }
}

/// A line of a journal entry before it is written.
///
/// Exactly one of `debit` and `credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    /// Account to post against.
    pub account_id: AccountId,
    /// Debit amount (zero on credit lines).
    pub debit: Decimal,
    /// Credit amount (zero on debit lines).
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

impl DraftLine {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo to the line.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A journal entry submitted for posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEntry {
    /// Idempotency key, if the producer supplies one.
    pub source: Option<SourceKey>,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Header narrative.
    pub description: String,
    /// Entry lines.
    pub lines: Vec<DraftLine>,
}

impl DraftEntry {
    /// Creates an entry with no lines.
    pub fn new(entry_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            source: None,
            entry_date,
            description: description.into(),
            lines: Vec::new(),
        }
    }

    /// Tags the entry with an idempotency key.
    #[must_use]
    pub fn with_source(mut self, source: SourceKey) -> Self {
        self.source = Some(source);
        self
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: DraftLine) -> Self {
        self.lines.push(line);
        self
    }
}

/// Summary of entry totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(total_debit: Decimal, total_credit: Decimal) -> Self {
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Sums the lines of an entry.
    #[must_use]
    pub fn of(lines: &[DraftLine]) -> Self {
        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        Self::new(total_debit, total_credit)
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}
