//! Event and outbox payload types, shared verbatim by the orchestrator
//! (producer) and the gateway (consumer). Kept dependency-free — no `sqlx`,
//! no `axum`, no bus client — so neither binary depends on the other; this
//! is the shared module the cyclic-module design note calls for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PickStarted,
    PickMade,
    DraftStarted,
    DraftPaused,
    DraftResumed,
    DraftCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PickStarted => "pick-started",
            EventKind::PickMade => "pick-made",
            EventKind::DraftStarted => "draft-started",
            EventKind::DraftPaused => "draft-paused",
            EventKind::DraftResumed => "draft-resumed",
            EventKind::DraftCompleted => "draft-completed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row in the durable outbox table: inserted transactionally with the
/// state change that produced it, marked sent by the Relay, never updated
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRow {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
}

impl OutboxRow {
    pub fn new(draft_id: Uuid, kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft_id,
            kind,
            payload,
            created_at: Utc::now(),
            sent_at: None,
            attempts: 0,
        }
    }

    pub fn subject(&self) -> String {
        subject_for_draft(self.draft_id)
    }

    pub fn into_envelope(self) -> EventEnvelope {
        EventEnvelope {
            id: self.id,
            draft_id: self.draft_id,
            kind: self.kind,
            timestamp: self.created_at,
            data: self.payload,
        }
    }
}

pub fn subject_for_draft(draft_id: Uuid) -> String {
    format!("draft.events.{draft_id}")
}

pub const STREAM_NAME: &str = "DRAFT_EVENTS";
pub const SUBJECT_FILTER: &str = "draft.events.>";

/// The wire format published to the bus and forwarded to WebSocket clients
/// verbatim: `{id, draft_id, type, timestamp, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub draft_id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl EventEnvelope {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Payload builders. Each matches the field list the Commit Protocol and the
/// state machine transitions call for in the data model.
pub mod payload {
    use serde_json::json;
    use uuid::Uuid;

    #[allow(clippy::too_many_arguments)]
    pub fn pick_made(
        pick_id: Uuid,
        player_id: Uuid,
        team_id: Uuid,
        overall_pick: i32,
        round: i32,
        pick_in_round: i32,
        picked_at: chrono::DateTime<chrono::Utc>,
    ) -> serde_json::Value {
        json!({
            "pick_id": pick_id,
            "player_id": player_id,
            "team_id": team_id,
            "overall_pick": overall_pick,
            "round": round,
            "pick": pick_in_round,
            "picked_at": picked_at,
        })
    }

    pub fn pick_started(
        pick_id: Uuid,
        team_id: Uuid,
        overall_pick: i32,
        round: i32,
        pick_in_round: i32,
        timeout_at: chrono::DateTime<chrono::Utc>,
    ) -> serde_json::Value {
        json!({
            "pick_id": pick_id,
            "team_id": team_id,
            "overall_pick": overall_pick,
            "round": round,
            "pick": pick_in_round,
            "timeout_at": timeout_at,
        })
    }

    pub fn draft_lifecycle(draft_id: Uuid) -> serde_json::Value {
        json!({ "draft_id": draft_id })
    }

    /// `draft-started` carries `total_picks` in addition to the bare
    /// lifecycle payload so the Gateway's projection can size the draft
    /// without a DB round-trip (§4.6.1).
    pub fn draft_started(draft_id: Uuid, total_picks: i32) -> serde_json::Value {
        json!({ "draft_id": draft_id, "total_picks": total_picks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EventKind::PickMade).unwrap();
        assert_eq!(json, "\"pick-made\"");
    }

    #[test]
    fn outbox_row_into_envelope_round_trips_json() {
        let row = OutboxRow::new(
            Uuid::new_v4(),
            EventKind::DraftStarted,
            payload::draft_lifecycle(Uuid::new_v4()),
        );
        let envelope = row.into_envelope();
        let json = envelope.to_json().unwrap();
        let parsed = EventEnvelope::from_json(&json).unwrap();
        assert_eq!(parsed.id, envelope.id);
        assert_eq!(parsed.kind, EventKind::DraftStarted);
    }

    #[test]
    fn subject_naming_matches_scheme() {
        let draft_id = Uuid::new_v4();
        assert_eq!(subject_for_draft(draft_id), format!("draft.events.{draft_id}"));
    }
}
