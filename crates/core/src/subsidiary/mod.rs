//! Subsidiary ledger link rules.
//!
//! A subsidiary ledger (cash box, bank account, customer or vendor book) mirrors the
//! balance of exactly one GL account. An account backs at most one active subsidiary.

use std::fmt;
use std::str::FromStr;

use bukubesar_shared::types::{AccountId, SubsidiaryId};
use serde::{Deserialize, Serialize};

use crate::ledger::error::{InvalidAccountReason, LedgerError};
use crate::ledger::service::AccountInfo;
use crate::ledger::types::AccountType;

/// Kind of subsidiary ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsidiaryKind {
    /// Cash box or bank account.
    CashBank,
    /// Customer receivables book.
    Receivable,
    /// Vendor payables book.
    Payable,
}

impl SubsidiaryKind {
    /// The only account type this kind may link to.
    #[must_use]
    pub const fn allowed_account_type(self) -> AccountType {
        match self {
            Self::CashBank | Self::Receivable => AccountType::Asset,
            Self::Payable => AccountType::Liability,
        }
    }

    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashBank => "cash_bank",
            Self::Receivable => "receivable",
            Self::Payable => "payable",
        }
    }
}

impl fmt::Display for SubsidiaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubsidiaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash_bank" | "cashbank" => Ok(Self::CashBank),
            "receivable" => Ok(Self::Receivable),
            "payable" => Ok(Self::Payable),
            other => Err(format!("unknown subsidiary kind: {other}")),
        }
    }
}

/// What a link request should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    /// Write the link and sync the balance.
    Link,
    /// The subsidiary already points at the account; nothing to do.
    Unchanged,
}

/// Current link state gathered under lock.
#[derive(Debug, Clone, Copy)]
pub struct LinkState {
    /// The subsidiary being linked.
    pub subsidiary_id: SubsidiaryId,
    /// Its current linked account.
    pub current_account: Option<AccountId>,
    /// Another active subsidiary already backed by the requested account.
    pub account_holder: Option<SubsidiaryId>,
}

/// Stateless link rules.
pub struct LinkRules;

impl LinkRules {
    /// Checks that `account` may back a subsidiary of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` for inactive, header or wrongly-typed accounts.
    pub fn validate_account(kind: SubsidiaryKind, account: &AccountInfo) -> Result<(), LedgerError> {
        account.ensure_postable()?;
        if account.account_type != kind.allowed_account_type() {
            return Err(LedgerError::invalid_account(
                account.id,
                InvalidAccountReason::TypeNotAllowed(account.account_type),
            ));
        }
        Ok(())
    }

    /// Decides a link request against the current link state.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyLinked` if the account backs another active subsidiary or the
    /// subsidiary is already linked to a different account.
    pub fn decide(state: LinkState, requested: AccountId) -> Result<LinkDecision, LedgerError> {
        if let Some(holder) = state.account_holder
            && holder != state.subsidiary_id
        {
            return Err(LedgerError::AlreadyLinked {
                account: requested,
                subsidiary: holder,
            });
        }

        match state.current_account {
            Some(current) if current == requested => Ok(LinkDecision::Unchanged),
            Some(current) => Err(LedgerError::AlreadyLinked {
                account: current,
                subsidiary: state.subsidiary_id,
            }),
            None => Ok(LinkDecision::Link),
        }
    }
}
