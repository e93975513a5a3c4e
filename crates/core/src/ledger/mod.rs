//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Domain types for journal creation
//! - Line validation (one-sided, non-negative, in range, exactly balanced)
//! - Sign convention and per-account balance deltas
//! - Posting plans built against locked account rows
//! - Chart of accounts hierarchy rules
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod hierarchy;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use balance::{BalanceDelta, NormalBalance};
pub use error::{InvalidAccountReason, LedgerError};
pub use hierarchy::{AccountNode, HierarchyService};
pub use service::{AccountInfo, PostingPlan, PostingService, ResolvedLine};
pub use types::{
    AccountType, DraftEntry, DraftLine, EntryStatus, EntryTotals, SourceKey, SourceType,
};
pub use validation::{AMOUNT_INTEGER_DIGITS, AMOUNT_SCALE, amount_fits, validate_lines};
