//! In-memory draft-state projection (§4.6.1): the Gateway's read model,
//! rebuilt purely from events off the bus. The Orchestrator's Postgres store
//! remains the source of truth; this is a point-in-time cache for snapshot
//! reads and for computing `time_remaining_sec` without a DB round-trip.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use domain::events::{EventEnvelope, EventKind};
use domain::models::DraftStatus;

/// The slot currently on the clock, if any.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentPick {
    pub pick_id: Uuid,
    pub team_id: Uuid,
    pub round: i32,
    pub overall_pick: i32,
    pub started_at: DateTime<Utc>,
    pub timeout_at: DateTime<Utc>,
}

/// A closed slot, recorded from its `pick-made` event. The projection's only
/// record of pick history, since the Gateway has no DB access of its own —
/// backs the `/api/drafts/{id}/picks` cursor-paginated endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickRecord {
    pub pick_id: Uuid,
    pub team_id: Uuid,
    pub player_id: Uuid,
    pub round: i32,
    pub overall_pick: i32,
    pub picked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DraftProjection {
    pub draft_id: Uuid,
    pub status: DraftStatus,
    pub current_pick: Option<CurrentPick>,
    pub total_picks: i32,
    pub completed_picks: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Ordered by `overall_pick` ascending, since `pick-made` events arrive
    /// in per-subject FIFO / commit order (§5).
    pub picks: Vec<PickRecord>,
}

impl DraftProjection {
    fn new(draft_id: Uuid) -> Self {
        Self {
            draft_id,
            status: DraftStatus::NotStarted,
            current_pick: None,
            total_picks: 0,
            completed_picks: 0,
            started_at: None,
            paused_at: None,
            completed_at: None,
            picks: Vec::new(),
        }
    }

    /// `time_remaining_sec` per §4.6.4: `max(0, timeout_at - now)`, so the
    /// client can render a countdown without clock sync.
    pub fn time_remaining_sec(&self, now: DateTime<Utc>) -> Option<i64> {
        self.current_pick
            .as_ref()
            .map(|pick| (pick.timeout_at - now).num_seconds().max(0))
    }

    fn apply(&mut self, envelope: &EventEnvelope) {
        match envelope.kind {
            EventKind::DraftStarted => {
                self.status = DraftStatus::InProgress;
                self.started_at = Some(envelope.timestamp);
                if let Some(total) = envelope.data.get("total_picks").and_then(|v| v.as_i64()) {
                    self.total_picks = total as i32;
                }
            }
            EventKind::DraftPaused => {
                self.status = DraftStatus::Paused;
                self.paused_at = Some(envelope.timestamp);
                self.current_pick = None;
            }
            EventKind::DraftResumed => {
                self.status = DraftStatus::InProgress;
                self.paused_at = None;
            }
            EventKind::DraftCompleted => {
                self.status = DraftStatus::Completed;
                self.completed_at = Some(envelope.timestamp);
                self.current_pick = None;
            }
            EventKind::PickStarted => {
                if let Some(pick) = parse_pick_started(&envelope.data, envelope.timestamp) {
                    self.current_pick = Some(pick);
                }
            }
            EventKind::PickMade => {
                self.completed_picks += 1;
                self.current_pick = None;
                if let Some(record) = parse_pick_made(&envelope.data) {
                    self.picks.push(record);
                }
            }
        }
    }
}

fn parse_pick_made(data: &serde_json::Value) -> Option<PickRecord> {
    Some(PickRecord {
        pick_id: data.get("pick_id")?.as_str()?.parse().ok()?,
        team_id: data.get("team_id")?.as_str()?.parse().ok()?,
        player_id: data.get("player_id")?.as_str()?.parse().ok()?,
        round: data.get("round")?.as_i64()? as i32,
        overall_pick: data.get("overall_pick")?.as_i64()? as i32,
        picked_at: data
            .get("picked_at")?
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
            .with_timezone(&Utc),
    })
}

fn parse_pick_started(data: &serde_json::Value, started_at: DateTime<Utc>) -> Option<CurrentPick> {
    Some(CurrentPick {
        pick_id: data.get("pick_id")?.as_str()?.parse().ok()?,
        team_id: data.get("team_id")?.as_str()?.parse().ok()?,
        round: data.get("round")?.as_i64()? as i32,
        overall_pick: data.get("overall_pick")?.as_i64()? as i32,
        started_at,
        timeout_at: data
            .get("timeout_at")?
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
            .with_timezone(&Utc),
    })
}

/// The full set of per-draft projections, guarded by a single `RwLock`
/// covering pointer manipulation only — never held across I/O, per §5.
#[derive(Clone, Default)]
pub struct ProjectionStore {
    inner: Arc<RwLock<HashMap<Uuid, DraftProjection>>>,
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event to the corresponding draft's projection, creating it
    /// on first sight (the gateway may start mid-draft and only ever learns
    /// about a draft from its events).
    pub async fn apply(&self, envelope: &EventEnvelope) {
        let mut drafts = self.inner.write().await;
        drafts
            .entry(envelope.draft_id)
            .or_insert_with(|| DraftProjection::new(envelope.draft_id))
            .apply(envelope);
    }

    pub async fn get(&self, draft_id: Uuid) -> Option<DraftProjection> {
        self.inner.read().await.get(&draft_id).cloned()
    }

    pub async fn active_drafts(&self) -> Vec<DraftProjection> {
        self.inner
            .read()
            .await
            .values()
            .filter(|p| matches!(p.status, DraftStatus::InProgress | DraftStatus::Paused))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::events::payload;

    fn envelope(draft_id: Uuid, kind: EventKind, data: serde_json::Value) -> EventEnvelope {
        EventEnvelope {
            id: Uuid::new_v4(),
            draft_id,
            kind,
            timestamp: Utc::now(),
            data,
        }
    }

    #[tokio::test]
    async fn draft_started_moves_to_in_progress_and_sets_total_picks() {
        let store = ProjectionStore::new();
        let draft_id = Uuid::new_v4();
        store
            .apply(&envelope(draft_id, EventKind::DraftStarted, payload::draft_started(draft_id, 120)))
            .await;

        let projection = store.get(draft_id).await.unwrap();
        assert_eq!(projection.status, DraftStatus::InProgress);
        assert!(projection.started_at.is_some());
        assert_eq!(projection.total_picks, 120);
    }

    #[tokio::test]
    async fn pick_made_increments_completed_and_clears_current_pick() {
        let store = ProjectionStore::new();
        let draft_id = Uuid::new_v4();
        let now = Utc::now();

        store
            .apply(&envelope(
                draft_id,
                EventKind::PickStarted,
                payload::pick_started(Uuid::new_v4(), Uuid::new_v4(), 1, 1, 1, now + chrono::Duration::seconds(30)),
            ))
            .await;
        let before = store.get(draft_id).await.unwrap();
        assert!(before.current_pick.is_some());

        store
            .apply(&envelope(
                draft_id,
                EventKind::PickMade,
                payload::pick_made(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 1, 1, 1, now),
            ))
            .await;

        let after = store.get(draft_id).await.unwrap();
        assert_eq!(after.completed_picks, 1);
        assert!(after.current_pick.is_none());
        assert_eq!(after.picks.len(), 1);
        assert_eq!(after.picks[0].overall_pick, 1);
    }

    #[tokio::test]
    async fn paused_and_completed_drafts_are_not_active() {
        let store = ProjectionStore::new();
        let draft_id = Uuid::new_v4();
        store
            .apply(&envelope(draft_id, EventKind::DraftStarted, payload::draft_lifecycle(draft_id)))
            .await;
        assert_eq!(store.active_drafts().await.len(), 1);

        store
            .apply(&envelope(draft_id, EventKind::DraftCompleted, payload::draft_lifecycle(draft_id)))
            .await;
        assert_eq!(store.active_drafts().await.len(), 0);
    }
}
