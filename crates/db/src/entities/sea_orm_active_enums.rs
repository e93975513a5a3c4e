//! String-backed enums shared by the entities.
//!
//! Stored as text so the same schema works on `PostgreSQL` and `SQLite`.

use bukubesar_core::ledger::types as domain;
use bukubesar_core::subsidiary::SubsidiaryKind as DomainKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "revenue")]
    Revenue,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum EntryStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SubsidiaryKind {
    #[sea_orm(string_value = "cash_bank")]
    CashBank,
    #[sea_orm(string_value = "receivable")]
    Receivable,
    #[sea_orm(string_value = "payable")]
    Payable,
}

impl From<AccountType> for domain::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<domain::AccountType> for AccountType {
    fn from(value: domain::AccountType) -> Self {
        match value {
            domain::AccountType::Asset => Self::Asset,
            domain::AccountType::Liability => Self::Liability,
            domain::AccountType::Equity => Self::Equity,
            domain::AccountType::Revenue => Self::Revenue,
            domain::AccountType::Expense => Self::Expense,
        }
    }
}

impl From<EntryStatus> for domain::EntryStatus {
    fn from(value: EntryStatus) -> Self {
        match value {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<domain::EntryStatus> for EntryStatus {
    fn from(value: domain::EntryStatus) -> Self {
        match value {
            domain::EntryStatus::Draft => Self::Draft,
            domain::EntryStatus::Posted => Self::Posted,
            domain::EntryStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<SubsidiaryKind> for DomainKind {
    fn from(value: SubsidiaryKind) -> Self {
        match value {
            SubsidiaryKind::CashBank => Self::CashBank,
            SubsidiaryKind::Receivable => Self::Receivable,
            SubsidiaryKind::Payable => Self::Payable,
        }
    }
}

impl From<DomainKind> for SubsidiaryKind {
    fn from(value: DomainKind) -> Self {
        match value {
            DomainKind::CashBank => Self::CashBank,
            DomainKind::Receivable => Self::Receivable,
            DomainKind::Payable => Self::Payable,
        }
    }
}
