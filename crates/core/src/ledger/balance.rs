//! Account balance calculations.
//!
//! Balances are signed by the account's normal side:
//! - Asset/Expense: balance += debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance += credit - debit (credit-normal)

use std::collections::BTreeMap;

use bukubesar_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side on which an account's balance grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense).
    Debit,
    /// Credit-normal accounts (Liability, Equity, Revenue).
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change for a debit/credit pair.
    #[must_use]
    pub fn calculate_balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Net change to apply to one account's cached balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// The account to update.
    pub account_id: AccountId,
    /// Signed amount to add to the balance.
    pub amount: Decimal,
}

/// Collapses lines into one delta per distinct account.
///
/// The result is sorted by ascending account id, which is the order rows must be
/// locked in. Accounts whose lines cancel out still get a (zero) delta so they
/// are locked and audited like any other touched account.
pub fn net_deltas<I>(lines: I) -> Vec<BalanceDelta>
where
    I: IntoIterator<Item = (AccountId, NormalBalance, Decimal, Decimal)>,
{
    let mut by_account: BTreeMap<AccountId, Decimal> = BTreeMap::new();
    for (account_id, normal, debit, credit) in lines {
        *by_account.entry(account_id).or_default() += normal.calculate_balance_change(debit, credit);
    }

    by_account
        .into_iter()
        .map(|(account_id, amount)| BalanceDelta { account_id, amount })
        .collect()
}

/// Returns the accounts of `deltas` in lock order.
#[must_use]
pub fn lock_order(deltas: &[BalanceDelta]) -> Vec<AccountId> {
    let mut ids: Vec<AccountId> = deltas.iter().map(|d| d.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
