//! Ledger schema migration.
//!
//! Creates accounts, journal entries and lines, subsidiary ledgers, the event log
//! and entry number counters. PostgreSQL gets exact NUMERIC money and native
//! UUID columns. The SQLite variant exists for the in-process test harness and
//! keeps money as TEXT holding the decimal's string form. Money checks that
//! would compare those strings are left to the engine there.

use sea_orm::DatabaseBackend;
use sea_orm_migration::prelude::*;

use super::run_script;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        let script = match manager.get_database_backend() {
            DatabaseBackend::Postgres => POSTGRES_SQL,
            DatabaseBackend::Sqlite => SQLITE_SQL,
            DatabaseBackend::MySql => {
                return Err(DbErr::Migration(
                    "MySQL is not supported by the ledger schema".to_string(),
                ));
            }
        };

        run_script(db, script).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        run_script(db, DROP_SQL).await
    }
}

const POSTGRES_SQL: &str = r"
-- Chart of accounts. Balance is the signed running total of posted lines.
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(16) NOT NULL
        CHECK (account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')),
    parent_id UUID REFERENCES accounts(id),
    is_header BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    balance NUMERIC(20, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_header_has_no_balance CHECK (NOT is_header OR balance = 0)
);

CREATE UNIQUE INDEX uq_accounts_code ON accounts(code);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;

-- Journal headers
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    entry_number VARCHAR(64) NOT NULL,
    source_type VARCHAR(32),
    source_id VARCHAR(128),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('draft', 'posted', 'reversed')),
    total_debit NUMERIC(20, 4) NOT NULL,
    total_credit NUMERIC(20, 4) NOT NULL,
    reverses UUID REFERENCES journal_entries(id),
    reversed_by UUID REFERENCES journal_entries(id),
    posted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_journal_balanced CHECK (total_debit = total_credit),
    CONSTRAINT chk_journal_source_pair CHECK ((source_type IS NULL) = (source_id IS NULL)),
    CONSTRAINT chk_journal_backlinks CHECK (reverses IS NULL OR reversed_by IS NULL)
);

CREATE UNIQUE INDEX uq_journal_entries_number ON journal_entries(entry_number);

-- Idempotency guard: one active entry per upstream source event
CREATE UNIQUE INDEX uq_journal_entries_active_source
    ON journal_entries(source_type, source_id)
    WHERE status <> 'reversed' AND source_type IS NOT NULL;

CREATE UNIQUE INDEX uq_journal_entries_reverses
    ON journal_entries(reverses) WHERE reverses IS NOT NULL;

CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date);

-- Journal lines
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    journal_id UUID NOT NULL REFERENCES journal_entries(id),
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_line_non_negative CHECK (debit_amount >= 0 AND credit_amount >= 0),
    CONSTRAINT chk_line_one_sided CHECK ((debit_amount = 0) <> (credit_amount = 0)),
    CONSTRAINT uq_journal_lines_number UNIQUE (journal_id, line_number)
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);

-- Subsidiary ledgers mirroring a GL account
CREATE TABLE subsidiary_ledgers (
    id UUID PRIMARY KEY,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(16) NOT NULL CHECK (kind IN ('cash_bank', 'receivable', 'payable')),
    linked_account_id UUID REFERENCES accounts(id),
    balance NUMERIC(20, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX uq_subsidiary_ledgers_code ON subsidiary_ledgers(code);

-- An account backs at most one active subsidiary
CREATE UNIQUE INDEX uq_subsidiary_ledgers_active_link
    ON subsidiary_ledgers(linked_account_id)
    WHERE is_active AND linked_account_id IS NOT NULL;

-- Append-only event log
CREATE TABLE event_log (
    id UUID PRIMARY KEY,
    entity_type VARCHAR(32) NOT NULL,
    entity_id UUID NOT NULL,
    action VARCHAR(16) NOT NULL,
    before_state JSONB,
    after_state JSONB,
    reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_event_log_entity ON event_log(entity_type, entity_id, created_at DESC);

-- Entry number counters
CREATE TABLE entry_sequences (
    prefix VARCHAR(16) NOT NULL,
    period VARCHAR(6) NOT NULL,
    next_value BIGINT NOT NULL DEFAULT 1,
    PRIMARY KEY (prefix, period)
)
";

const SQLITE_SQL: &str = r"
CREATE TABLE accounts (
    id BLOB PRIMARY KEY NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL
        CHECK (account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')),
    parent_id BLOB REFERENCES accounts(id),
    is_header BOOLEAN NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    balance TEXT NOT NULL DEFAULT '0',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX uq_accounts_code ON accounts(code);

CREATE TABLE journal_entries (
    id BLOB PRIMARY KEY NOT NULL,
    entry_number TEXT NOT NULL,
    source_type TEXT,
    source_id TEXT,
    entry_date TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('draft', 'posted', 'reversed')),
    total_debit TEXT NOT NULL,
    total_credit TEXT NOT NULL,
    reverses BLOB REFERENCES journal_entries(id),
    reversed_by BLOB REFERENCES journal_entries(id),
    posted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (reverses IS NULL OR reversed_by IS NULL)
);

CREATE UNIQUE INDEX uq_journal_entries_number ON journal_entries(entry_number);

CREATE UNIQUE INDEX uq_journal_entries_active_source
    ON journal_entries(source_type, source_id)
    WHERE status <> 'reversed' AND source_type IS NOT NULL;

CREATE UNIQUE INDEX uq_journal_entries_reverses
    ON journal_entries(reverses) WHERE reverses IS NOT NULL;

CREATE TABLE journal_lines (
    id BLOB PRIMARY KEY NOT NULL,
    journal_id BLOB NOT NULL REFERENCES journal_entries(id),
    line_number INTEGER NOT NULL,
    account_id BLOB NOT NULL REFERENCES accounts(id),
    debit_amount TEXT NOT NULL DEFAULT '0',
    credit_amount TEXT NOT NULL DEFAULT '0',
    description TEXT,
    created_at TEXT NOT NULL,
    CHECK (debit_amount NOT LIKE '-%' AND credit_amount NOT LIKE '-%'),
    UNIQUE (journal_id, line_number)
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);

CREATE TABLE subsidiary_ledgers (
    id BLOB PRIMARY KEY NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('cash_bank', 'receivable', 'payable')),
    linked_account_id BLOB REFERENCES accounts(id),
    balance TEXT NOT NULL DEFAULT '0',
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX uq_subsidiary_ledgers_code ON subsidiary_ledgers(code);

CREATE UNIQUE INDEX uq_subsidiary_ledgers_active_link
    ON subsidiary_ledgers(linked_account_id)
    WHERE is_active = 1 AND linked_account_id IS NOT NULL;

CREATE TABLE event_log (
    id BLOB PRIMARY KEY NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id BLOB NOT NULL,
    action TEXT NOT NULL,
    before_state TEXT,
    after_state TEXT,
    reason TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX idx_event_log_entity ON event_log(entity_type, entity_id);

CREATE TABLE entry_sequences (
    prefix TEXT NOT NULL,
    period TEXT NOT NULL,
    next_value INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (prefix, period)
)
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS entry_sequences;
DROP TABLE IF EXISTS event_log;
DROP TABLE IF EXISTS subsidiary_ledgers;
DROP TABLE IF EXISTS journal_lines;
DROP TABLE IF EXISTS journal_entries;
DROP TABLE IF EXISTS accounts
";
