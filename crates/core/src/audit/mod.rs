//! Event log record shapes.
//!
//! Every state transition appends one event. Events are never updated or deleted.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Kind of entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Chart of accounts entry.
    Account,
    /// Journal entry.
    JournalEntry,
    /// Subsidiary ledger.
    Subsidiary,
}

impl EntityType {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::JournalEntry => "journal_entry",
            Self::Subsidiary => "subsidiary",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Entity created.
    Create,
    /// Entry posted or balance moved by a posting.
    Post,
    /// Entry reversed.
    Reverse,
    /// Balance healed by the reconciler.
    Reconcile,
    /// Subsidiary linked to an account.
    Link,
    /// Subsidiary unlinked.
    Unlink,
    /// Account deactivated.
    Deactivate,
}

impl EventAction {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Post => "post",
            Self::Reverse => "reverse",
            Self::Reconcile => "reconcile",
            Self::Link => "link",
            Self::Unlink => "unlink",
            Self::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event to append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Kind of entity.
    pub entity_type: EntityType,
    /// Entity ID.
    pub entity_id: Uuid,
    /// What happened.
    pub action: EventAction,
    /// State before the change.
    pub before: Option<Value>,
    /// State after the change.
    pub after: Option<Value>,
    /// Free-text reason supplied by the caller.
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Creates an event with no payload.
    #[must_use]
    pub const fn new(entity_type: EntityType, entity_id: Uuid, action: EventAction) -> Self {
        Self {
            entity_type,
            entity_id,
            action,
            before: None,
            after: None,
            reason: None,
        }
    }

    /// Event recording a balance moving from `before` to `after`.
    #[must_use]
    pub fn balance_change(
        entity_type: EntityType,
        entity_id: Uuid,
        action: EventAction,
        before: Decimal,
        after: Decimal,
    ) -> Self {
        Self::new(entity_type, entity_id, action)
            .with_before(json!({ "balance": before }))
            .with_after(json!({ "balance": after }))
    }

    /// Attaches the prior state.
    #[must_use]
    pub fn with_before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Attaches the new state.
    #[must_use]
    pub fn with_after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }

    /// Attaches the caller's reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
