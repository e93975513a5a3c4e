//! Cached-versus-calculated balance comparison.
//!
//! The store aggregates line sums per account. This module turns those sums into
//! the balance the account should hold and reports any mismatch. Zero tolerance:
//! any difference at all is a discrepancy.

use bukubesar_shared::types::{AccountId, SubsidiaryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::types::AccountType;

/// Debit and credit sums of the balance-affecting lines of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineSums {
    /// Sum of debit amounts.
    pub debit: Decimal,
    /// Sum of credit amounts.
    pub credit: Decimal,
}

/// Cached state of an account being reconciled.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    /// The account ID.
    pub account_id: AccountId,
    /// Business code.
    pub code: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Balance stored on the account row.
    pub cached: Decimal,
}

/// Mismatch between an account's cached and calculated balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// The account ID.
    pub account_id: AccountId,
    /// Business code.
    pub code: String,
    /// Balance stored on the account row.
    pub cached: Decimal,
    /// Balance implied by the journal lines.
    pub calculated: Decimal,
    /// `calculated - cached`.
    pub delta: Decimal,
}

/// Mismatch between a subsidiary ledger and its linked GL account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidiaryDiscrepancy {
    /// The subsidiary ledger.
    pub subsidiary_id: SubsidiaryId,
    /// Subsidiary code.
    pub code: String,
    /// The linked GL account.
    pub account_id: AccountId,
    /// Balance on the subsidiary row.
    pub subsidiary_balance: Decimal,
    /// Balance on the account row.
    pub account_balance: Decimal,
    /// `account_balance - subsidiary_balance`.
    pub delta: Decimal,
}

/// Stateless reconciliation rules.
pub struct BalanceReconciler;

impl BalanceReconciler {
    /// Balance implied by line sums under the account's sign convention.
    #[must_use]
    pub fn calculated_balance(account_type: AccountType, sums: LineSums) -> Decimal {
        account_type
            .normal_balance()
            .calculate_balance_change(sums.debit, sums.credit)
    }

    /// Compares a cached balance with its line sums.
    #[must_use]
    pub fn compare(account: &AccountSnapshot, sums: LineSums) -> Option<Discrepancy> {
        let calculated = Self::calculated_balance(account.account_type, sums);
        if calculated == account.cached {
            return None;
        }
        Some(Discrepancy {
            account_id: account.account_id,
            code: account.code.clone(),
            cached: account.cached,
            calculated,
            delta: calculated - account.cached,
        })
    }

    /// Compares a subsidiary balance with its linked account balance.
    #[must_use]
    pub fn compare_subsidiary(
        subsidiary_id: SubsidiaryId,
        code: &str,
        account_id: AccountId,
        subsidiary_balance: Decimal,
        account_balance: Decimal,
    ) -> Option<SubsidiaryDiscrepancy> {
        if subsidiary_balance == account_balance {
            return None;
        }
        Some(SubsidiaryDiscrepancy {
            subsidiary_id,
            code: code.to_string(),
            account_id,
            subsidiary_balance,
            account_balance,
            delta: account_balance - subsidiary_balance,
        })
    }
}
