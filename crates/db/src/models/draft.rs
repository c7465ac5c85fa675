use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Draft, DraftPick, DraftSettings, DraftStatus, DraftType};

use crate::errors::{DbError, DbResult};

/// Database model for the `drafts` table. `settings` is stored as `jsonb`
/// since its shape (team order, per-type options) varies with `draft_type`
/// and has no need to be queried column-by-column.
#[derive(Debug, Clone, FromRow)]
pub struct DraftDb {
    pub id: Uuid,
    pub league_id: Uuid,
    pub draft_type: String,
    pub status: String,
    pub settings: serde_json::Value,
    pub next_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DraftDb {
    pub fn from_domain(draft: &Draft) -> DbResult<Self> {
        Ok(Self {
            id: draft.id,
            league_id: draft.league_id,
            draft_type: draft_type_to_string(draft.draft_type),
            status: status_to_string(draft.status),
            settings: serde_json::to_value(&draft.settings)
                .map_err(|e| DbError::MappingError(format!("failed to serialize settings: {e}")))?,
            next_deadline: draft.next_deadline,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
            scheduled_at: draft.scheduled_at,
            started_at: draft.started_at,
            completed_at: draft.completed_at,
        })
    }

    pub fn to_domain(&self) -> DbResult<Draft> {
        let settings: DraftSettings = serde_json::from_value(self.settings.clone())
            .map_err(|e| DbError::MappingError(format!("failed to deserialize settings: {e}")))?;

        Ok(Draft {
            id: self.id,
            league_id: self.league_id,
            draft_type: string_to_draft_type(&self.draft_type)?,
            status: string_to_status(&self.status)?,
            settings,
            next_deadline: self.next_deadline,
            created_at: self.created_at,
            updated_at: self.updated_at,
            scheduled_at: self.scheduled_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// Database model for the `draft_picks` table.
#[derive(Debug, Clone, FromRow)]
pub struct DraftPickDb {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub round: i32,
    pub pick_in_round: i32,
    pub overall_pick: i32,
    pub team_id: Uuid,
    pub player_id: Option<Uuid>,
    pub picked_at: Option<DateTime<Utc>>,
    pub auction_amount: Option<i32>,
    pub is_keeper: bool,
}

impl DraftPickDb {
    pub fn from_domain(pick: &DraftPick) -> Self {
        Self {
            id: pick.id,
            draft_id: pick.draft_id,
            round: pick.round,
            pick_in_round: pick.pick_in_round,
            overall_pick: pick.overall_pick,
            team_id: pick.team_id,
            player_id: pick.player_id,
            picked_at: pick.picked_at,
            auction_amount: pick.auction_amount,
            is_keeper: pick.is_keeper,
        }
    }

    pub fn to_domain(&self) -> DraftPick {
        DraftPick {
            id: self.id,
            draft_id: self.draft_id,
            round: self.round,
            pick_in_round: self.pick_in_round,
            overall_pick: self.overall_pick,
            team_id: self.team_id,
            player_id: self.player_id,
            picked_at: self.picked_at,
            auction_amount: self.auction_amount,
            is_keeper: self.is_keeper,
        }
    }
}

fn status_to_string(status: DraftStatus) -> String {
    status.to_string()
}

fn string_to_status(s: &str) -> DbResult<DraftStatus> {
    match s {
        "NotStarted" => Ok(DraftStatus::NotStarted),
        "InProgress" => Ok(DraftStatus::InProgress),
        "Paused" => Ok(DraftStatus::Paused),
        "Completed" => Ok(DraftStatus::Completed),
        "Cancelled" => Ok(DraftStatus::Cancelled),
        other => Err(DbError::MappingError(format!("invalid draft status: {other}"))),
    }
}

fn draft_type_to_string(draft_type: DraftType) -> String {
    match draft_type {
        DraftType::Snake => "snake",
        DraftType::Auction => "auction",
        DraftType::Rookie => "rookie",
    }
    .to_string()
}

fn string_to_draft_type(s: &str) -> DbResult<DraftType> {
    match s {
        "snake" => Ok(DraftType::Snake),
        "auction" => Ok(DraftType::Auction),
        "rookie" => Ok(DraftType::Rookie),
        other => Err(DbError::MappingError(format!("invalid draft type: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::DraftSettings;

    fn team_order(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn draft_round_trips_through_db_model() {
        let settings = DraftSettings::new(3, 60, team_order(4)).unwrap();
        let draft = Draft::new(Uuid::new_v4(), DraftType::Snake, settings, None);

        let draft_db = DraftDb::from_domain(&draft).unwrap();
        assert_eq!(draft_db.status, "NotStarted");
        assert_eq!(draft_db.draft_type, "snake");

        let round_tripped = draft_db.to_domain().unwrap();
        assert_eq!(round_tripped.id, draft.id);
        assert_eq!(round_tripped.settings.rounds, 3);
        assert_eq!(round_tripped.settings.team_order.len(), 4);
    }

    #[test]
    fn draft_pick_round_trips_through_db_model() {
        let pick = DraftPick::new_open(Uuid::new_v4(), 1, 1, 1, Uuid::new_v4());
        let pick_db = DraftPickDb::from_domain(&pick);
        let round_tripped = pick_db.to_domain();
        assert_eq!(round_tripped.id, pick.id);
        assert!(round_tripped.is_open());
    }
}
