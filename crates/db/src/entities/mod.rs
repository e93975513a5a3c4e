//! `SeaORM` entity definitions.

pub mod accounts;
pub mod entry_sequences;
pub mod event_log;
pub mod journal_entries;
pub mod journal_lines;
pub mod money;
pub mod sea_orm_active_enums;
pub mod subsidiary_ledgers;
