//! Reversal service for posted journal entries.
//!
//! This module builds the reversing draft for a posted entry and decides whether
//! an entry may be reversed at all.

use bukubesar_shared::types::{AccountId, JournalEntryId};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ledger::error::LedgerError;
use crate::ledger::types::{DraftEntry, DraftLine, EntryStatus, SourceKey};

/// A stored line of the entry being reversed.
#[derive(Debug, Clone)]
pub struct OriginalLine {
    /// The account ID.
    pub account_id: AccountId,
    /// The debit amount (0 if credit).
    pub debit: Decimal,
    /// The credit amount (0 if debit).
    pub credit: Decimal,
    /// Optional memo.
    pub description: Option<String>,
}

/// Input for building a reversing entry.
#[derive(Debug, Clone)]
pub struct ReversalInput<'a> {
    /// The entry being reversed.
    pub original_id: JournalEntryId,
    /// Its human-readable number.
    pub original_number: &'a str,
    /// Accounting date of the reversal.
    pub reversal_date: NaiveDate,
    /// Why the entry is reversed.
    pub reason: &'a str,
    /// The original lines in stored order.
    pub lines: &'a [OriginalLine],
}

/// Answer to "can this entry be reversed?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversibility {
    /// Whether reversal is allowed now.
    pub allowed: bool,
    /// Human-readable explanation.
    pub explanation: String,
}

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Build the reversing draft by swapping debits and credits.
    ///
    /// For each original line:
    /// - Debits become credits
    /// - Credits become debits
    /// - The account is preserved
    /// - Memo is prefixed with "Reversal: "
    ///
    /// The draft carries the key `(REVERSAL, <original id>)` so a retried reversal
    /// resolves to the same entry.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for a blank reason.
    pub fn build(input: &ReversalInput<'_>) -> Result<DraftEntry, LedgerError> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired);
        }

        let lines = input
            .lines
            .iter()
            .map(|line| DraftLine {
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                description: Some(format!(
                    "Reversal: {}",
                    line.description.clone().unwrap_or_default()
                )),
            })
            .collect();

        Ok(DraftEntry {
            source: Some(SourceKey::reversal_of(input.original_id)),
            entry_date: input.reversal_date,
            description: format!("Reversal of {}: {reason}", input.original_number),
            lines,
        })
    }

    /// Entry number of the reversal of `original_number`.
    #[must_use]
    pub fn reversal_number(prefix: &str, original_number: &str) -> String {
        format!("{prefix}-{original_number}")
    }

    /// Validate that original lines are balanced.
    ///
    /// This should always be true for posted entries.
    #[must_use]
    pub fn validate_reversal(lines: &[OriginalLine]) -> bool {
        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();

        total_debit == total_credit
    }

    /// Checks that an entry may be reversed now.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the entry is posted and not yet reversed, and
    /// `CannotReverseReversal` for entries that reverse another entry.
    pub fn check_reversible(
        entry: JournalEntryId,
        status: EntryStatus,
        reversed_by: Option<JournalEntryId>,
        reverses: Option<JournalEntryId>,
    ) -> Result<(), LedgerError> {
        if reverses.is_some() {
            return Err(LedgerError::CannotReverseReversal(entry));
        }
        if status != EntryStatus::Posted || reversed_by.is_some() {
            return Err(LedgerError::InvalidState {
                entry,
                status,
                expected: EntryStatus::Posted,
            });
        }
        Ok(())
    }

    /// Explains whether an entry may be reversed.
    #[must_use]
    pub fn reversibility(
        status: EntryStatus,
        reversed_by: Option<JournalEntryId>,
        reverses: Option<JournalEntryId>,
    ) -> Reversibility {
        let (allowed, explanation) = match (status, reversed_by) {
            (EntryStatus::Reversed, Some(by)) => (false, format!("already reversed by {by}")),
            (EntryStatus::Reversed, None) => (false, "already reversed".to_string()),
            (EntryStatus::Draft, _) => (false, "draft entries have no balance effect".to_string()),
            (EntryStatus::Posted, Some(by)) => (false, format!("already reversed by {by}")),
            (EntryStatus::Posted, None) => match reverses {
                Some(original) => (false, format!("entry is the reversal of {original}")),
                None => (true, "entry can be reversed".to_string()),
            },
        };
        Reversibility {
            allowed,
            explanation,
        }
    }
}
