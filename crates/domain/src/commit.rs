//! The Pick Commit Protocol (§4.2): the single transaction that claims a
//! slot, writes the player, appends an outbox row, and advances the
//! draft's deadline — or completes the draft if that was the final slot.
//!
//! There is exactly one real implementation, `db::SqlxCommitProtocol`; this
//! trait exists so the Scheduler Loop and the Orchestrator's RPC handlers
//! depend on an abstraction rather than `sqlx` directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::{Draft, DraftPick};

/// The outcome of a successful commit.
#[derive(Debug, Clone, Copy)]
pub struct CommitOutcome {
    pub pick_id: Uuid,
    pub overall_pick: i32,
    /// True if this was the final open slot and the draft transitioned to
    /// completed as part of this same commit.
    pub draft_completed: bool,
}

#[async_trait]
pub trait CommitProtocol: Send + Sync {
    /// Claim `pick_id` for `team_id`/`player_id`. Fails with
    /// `DomainError::AlreadyPicked` if the slot is already closed,
    /// `DomainError::SlotNotFound` if no such slot exists for this draft, or
    /// `DomainError::DraftNotInProgress` if the draft is not live.
    async fn commit_user_pick(
        &self,
        draft_id: Uuid,
        pick_id: Uuid,
        team_id: Uuid,
        player_id: Uuid,
    ) -> DomainResult<CommitOutcome>;

    /// Claim the open slot with the smallest `overall_pick` for `draft_id`
    /// and assign `player_id` to its team. Returns `Ok(None)` if every slot
    /// is already closed (the scheduler treats this as "nothing to do").
    async fn commit_auto_pick(
        &self,
        draft_id: Uuid,
        player_id: Uuid,
    ) -> DomainResult<Option<CommitOutcome>>;

    /// Persist `picks` and the already-transitioned `draft` (caller has run
    /// `Draft::start`) in one transaction, emitting `draft-started`.
    async fn start_draft(&self, draft: Draft, picks: Vec<DraftPick>) -> DomainResult<Draft>;

    /// Clear the deadline and persist the paused draft, emitting
    /// `draft-paused`. Fails with `DraftNotInProgress` if the draft isn't
    /// currently live.
    async fn pause_draft(&self, draft_id: Uuid) -> DomainResult<Draft>;

    /// Re-arm the deadline and persist the resumed draft, emitting
    /// `draft-resumed`. Fails with `DomainError::InvalidState` if the draft
    /// isn't currently paused.
    async fn resume_draft(&self, draft_id: Uuid) -> DomainResult<Draft>;

    /// Called by the Scheduler when the Auto-Pick Strategy found no
    /// available players for `draft_id`. Checks the remaining open-pick
    /// count under the same lock `commit_auto_pick` uses: if none remain the
    /// draft completes and emits `draft-completed`; otherwise the deadline
    /// is advanced by one more `time_per_pick` so the scheduler doesn't
    /// re-fire on the same slot every poll. Returns whether the draft
    /// completed.
    async fn handle_pick_exhaustion(&self, draft_id: Uuid) -> DomainResult<bool>;
}
