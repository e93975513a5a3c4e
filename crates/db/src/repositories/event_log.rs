//! Event log repository.
//!
//! The log is append-only. Writers call [`append`] with the transaction that
//! performs the change, so an event exists exactly when its change committed.

use bukubesar_core::audit::{AuditEvent, EntityType};
use bukubesar_core::ledger::LedgerError;
use bukubesar_shared::types::{EventId, Page, PageRequest};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::error::DbResultExt;
use crate::entities::event_log;

/// Appends one event using `db`, normally the open transaction.
pub(crate) async fn append<C>(db: &C, event: AuditEvent) -> Result<event_log::Model, LedgerError>
where
    C: ConnectionTrait,
{
    event_log::ActiveModel {
        id: Set(EventId::new().into_inner()),
        entity_type: Set(event.entity_type.as_str().to_string()),
        entity_id: Set(event.entity_id),
        action: Set(event.action.as_str().to_string()),
        before_state: Set(event.before),
        after_state: Set(event.after),
        reason: Set(event.reason),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .ledger()
}

/// Read access to the event log.
#[derive(Debug, Clone)]
pub struct EventLogRepository {
    db: DatabaseConnection,
}

impl EventLogRepository {
    /// Creates a new event log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Events recorded for one entity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        page: &PageRequest,
    ) -> Result<Page<event_log::Model>, LedgerError> {
        let query = event_log::Entity::find()
            .filter(event_log::Column::EntityType.eq(entity_type.as_str()))
            .filter(event_log::Column::EntityId.eq(entity_id));

        let total = query.clone().count(&self.db).await.ledger()?;

        // v7 ids are time-ordered and break ties between events of one transaction
        let items = query
            .order_by_desc(event_log::Column::CreatedAt)
            .order_by_desc(event_log::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .ledger()?;

        Ok(Page { items, total })
    }
}
