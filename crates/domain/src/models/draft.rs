use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftStatus::NotStarted => write!(f, "NotStarted"),
            DraftStatus::InProgress => write!(f, "InProgress"),
            DraftStatus::Paused => write!(f, "Paused"),
            DraftStatus::Completed => write!(f, "Completed"),
            DraftStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DraftType {
    Snake,
    Auction,
    Rookie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuctionSettings {
    pub budget_per_team: i32,
    pub min_bid_increment: i32,
    pub time_per_nomination_secs: i32,
}

/// Embedded draft configuration. `team_order` is round 1's pick order; later
/// rounds derive their order from it per the snake/third-round-reversal rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DraftSettings {
    pub rounds: i32,
    pub time_per_pick_secs: i32,
    pub team_order: Vec<Uuid>,
    pub third_round_reversal: bool,
    pub auction: Option<AuctionSettings>,
}

impl DraftSettings {
    pub fn new(rounds: i32, time_per_pick_secs: i32, team_order: Vec<Uuid>) -> DomainResult<Self> {
        Self::validate_rounds(rounds)?;
        Self::validate_time_per_pick(time_per_pick_secs)?;
        Self::validate_team_order(&team_order)?;
        Ok(Self {
            rounds,
            time_per_pick_secs,
            team_order,
            third_round_reversal: false,
            auction: None,
        })
    }

    pub fn with_third_round_reversal(mut self, enabled: bool) -> Self {
        self.third_round_reversal = enabled;
        self
    }

    fn validate_rounds(rounds: i32) -> DomainResult<()> {
        if !(1..=50).contains(&rounds) {
            return Err(DomainError::ValidationError(format!(
                "rounds must be between 1 and 50, got {rounds}"
            )));
        }
        Ok(())
    }

    fn validate_time_per_pick(secs: i32) -> DomainResult<()> {
        if secs < 1 {
            return Err(DomainError::ValidationError(format!(
                "time_per_pick_secs must be >= 1, got {secs}"
            )));
        }
        Ok(())
    }

    fn validate_team_order(order: &[Uuid]) -> DomainResult<()> {
        if order.is_empty() {
            return Err(DomainError::ValidationError(
                "team_order must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn team_count(&self) -> usize {
        self.team_order.len()
    }

    pub fn total_picks(&self) -> i32 {
        self.rounds * self.team_order.len() as i32
    }

    /// Returns true if `round` (1-indexed) runs in reverse order relative to
    /// `team_order`. Standard snake reverses every even round; with
    /// third-round-reversal, round 3 also reverses rather than flipping back,
    /// matching the common fantasy-football "TRR" variant.
    fn round_is_reversed(&self, round: i32) -> bool {
        let even = round % 2 == 0;
        even || (self.third_round_reversal && round == 3)
    }

    /// The team owning `pick_in_round` (1-indexed) of `round` (1-indexed).
    pub fn team_for_pick(&self, round: i32, pick_in_round: i32) -> DomainResult<Uuid> {
        let n = self.team_order.len();
        let idx = (pick_in_round - 1) as usize;
        if idx >= n {
            return Err(DomainError::ValidationError(format!(
                "pick_in_round {pick_in_round} out of range for {n} teams"
            )));
        }
        let idx = if self.round_is_reversed(round) {
            n - 1 - idx
        } else {
            idx
        };
        Ok(self.team_order[idx])
    }

    /// `overall_pick` for `(round, pick_in_round)`, independent of reversal.
    pub fn overall_pick(&self, round: i32, pick_in_round: i32) -> i32 {
        (round - 1) * self.team_order.len() as i32 + pick_in_round
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub league_id: Uuid,
    pub draft_type: DraftType,
    pub status: DraftStatus,
    pub settings: DraftSettings,
    pub next_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn new(
        league_id: Uuid,
        draft_type: DraftType,
        settings: DraftSettings,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            league_id,
            draft_type,
            status: DraftStatus::NotStarted,
            settings,
            next_deadline: None,
            created_at: now,
            updated_at: now,
            scheduled_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// Set status and timestamps directly, bypassing the transition rules in
    /// `start`/`pause`/`resume`/`complete`/`cancel`.
    ///
    /// Intended for the repository layer when hydrating a row from storage,
    /// not for driving the state machine — use the transition methods for
    /// that so invariants stay enforced.
    pub fn with_status(mut self, status: DraftStatus) -> Self {
        self.status = status;
        self
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            DraftStatus::NotStarted => {
                self.status = DraftStatus::InProgress;
                self.started_at = Some(now);
                self.next_deadline = Some(
                    now + chrono::Duration::seconds(self.settings.time_per_pick_secs as i64),
                );
                self.updated_at = now;
                Ok(())
            }
            other => Err(DomainError::InvalidState(format!(
                "cannot start draft in state {other}"
            ))),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            DraftStatus::InProgress => {
                self.status = DraftStatus::Paused;
                self.next_deadline = None;
                self.updated_at = now;
                Ok(())
            }
            other => Err(DomainError::InvalidState(format!(
                "cannot pause draft in state {other}"
            ))),
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            DraftStatus::Paused => {
                self.status = DraftStatus::InProgress;
                self.next_deadline = Some(
                    now + chrono::Duration::seconds(self.settings.time_per_pick_secs as i64),
                );
                self.updated_at = now;
                Ok(())
            }
            other => Err(DomainError::InvalidState(format!(
                "cannot resume draft in state {other}"
            ))),
        }
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            DraftStatus::Completed | DraftStatus::Cancelled => Err(DomainError::InvalidState(
                format!("cannot cancel draft in state {}", self.status),
            )),
            _ => {
                self.status = DraftStatus::Cancelled;
                self.next_deadline = None;
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Advance the deadline after a non-final pick commits.
    pub fn advance_deadline(&mut self, now: DateTime<Utc>) {
        self.next_deadline =
            Some(now + chrono::Duration::seconds(self.settings.time_per_pick_secs as i64));
        self.updated_at = now;
    }

    /// Complete the draft as part of the same commit as the final pick.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = DraftStatus::Completed;
        self.next_deadline = None;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_live(&self) -> bool {
        matches!(self.status, DraftStatus::InProgress)
    }
}

/// A reserved position in the draft grid, pre-populated at creation time.
/// `player_id.is_none()` means the slot is open; once closed it never
/// re-opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPick {
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

impl DraftPick {
    pub fn new_open(
        draft_id: Uuid,
        round: i32,
        pick_in_round: i32,
        overall_pick: i32,
        team_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft_id,
            round,
            pick_in_round,
            overall_pick,
            team_id,
            player_id: None,
            picked_at: None,
            auction_amount: None,
            is_keeper: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.player_id.is_none()
    }
}

/// Generate every slot for `draft` under `draft.settings`, in overall-pick
/// order. Pre-populated at draft creation; `DraftPickRepository::create_many`
/// persists the result in one batch.
pub fn generate_picks(draft: &Draft) -> DomainResult<Vec<DraftPick>> {
    let settings = &draft.settings;
    let n = settings.team_count() as i32;
    let mut picks = Vec::with_capacity((settings.rounds * n) as usize);
    for round in 1..=settings.rounds {
        for pick_in_round in 1..=n {
            let team_id = settings.team_for_pick(round, pick_in_round)?;
            let overall_pick = settings.overall_pick(round, pick_in_round);
            picks.push(DraftPick::new_open(
                draft.id,
                round,
                pick_in_round,
                overall_pick,
                team_id,
            ));
        }
    }
    Ok(picks)
}
