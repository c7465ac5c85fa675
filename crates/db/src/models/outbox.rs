use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::events::{EventKind, OutboxRow};

use crate::errors::{DbError, DbResult};

/// Database model for the `outbox` table.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxDb {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
}

impl OutboxDb {
    pub fn to_domain(&self) -> DbResult<OutboxRow> {
        Ok(OutboxRow {
            id: self.id,
            draft_id: self.draft_id,
            kind: string_to_kind(&self.kind)?,
            payload: self.payload.clone(),
            created_at: self.created_at,
            sent_at: self.sent_at,
            attempts: self.attempts,
        })
    }
}

pub fn kind_to_string(kind: EventKind) -> String {
    kind.as_str().to_string()
}

fn string_to_kind(s: &str) -> DbResult<EventKind> {
    match s {
        "pick-started" => Ok(EventKind::PickStarted),
        "pick-made" => Ok(EventKind::PickMade),
        "draft-started" => Ok(EventKind::DraftStarted),
        "draft-paused" => Ok(EventKind::DraftPaused),
        "draft-resumed" => Ok(EventKind::DraftResumed),
        "draft-completed" => Ok(EventKind::DraftCompleted),
        other => Err(DbError::MappingError(format!("invalid event kind: {other}"))),
    }
}
