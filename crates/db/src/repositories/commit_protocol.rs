use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use domain::commit::{CommitOutcome, CommitProtocol};
use domain::errors::{DomainError, DomainResult};
use domain::events::{payload, EventKind};
use domain::models::{Draft, DraftPick, DraftSettings};

use crate::errors::DbError;
use crate::models::outbox::kind_to_string;
use crate::models::DraftDb;

/// The one real implementation of the Pick Commit Protocol: claim, write,
/// outbox, advance-or-complete, all inside a single transaction. The only
/// idempotency mechanism is the affected-row count on the claiming UPDATE —
/// there is no separate "already picked" pre-check, so two concurrent
/// attempts on the same slot always resolve to exactly one winner.
pub struct SqlxCommitProtocol {
    pool: PgPool,
}

impl SqlxCommitProtocol {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct LockedDraft {
    status: String,
    settings: serde_json::Value,
}

async fn lock_draft_in_progress(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
) -> DomainResult<DraftSettings> {
    let draft = sqlx::query_as!(
        LockedDraft,
        r#"SELECT status, settings FROM drafts WHERE id = $1 FOR UPDATE"#,
        draft_id
    )
    .fetch_optional(&mut **tx)
    .await
    .map_err(DbError::DatabaseError)?
    .ok_or_else(|| DomainError::NotFound(format!("draft {draft_id} not found")))?;

    if draft.status != "InProgress" {
        return Err(DbError::DraftNotInProgress(format!(
            "draft {draft_id} is {}",
            draft.status
        ))
        .into());
    }

    serde_json::from_value(draft.settings)
        .map_err(|e| DbError::MappingError(format!("failed to deserialize settings: {e}")).into())
}

async fn insert_outbox(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
    kind: EventKind,
    payload: serde_json::Value,
) -> DomainResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO outbox (id, draft_id, kind, payload, created_at, attempts)
        VALUES ($1, $2, $3, $4, now(), 0)
        "#,
        Uuid::new_v4(),
        draft_id,
        kind_to_string(kind),
        payload,
    )
    .execute(&mut **tx)
    .await
    .map_err(DbError::DatabaseError)?;

    Ok(())
}

struct OpenSlot {
    id: Uuid,
    round: i32,
    pick_in_round: i32,
    overall_pick: i32,
    team_id: Uuid,
}

/// The open slot with the smallest `overall_pick` for `draft_id`, or `None`
/// if every slot is closed. Used to describe whichever slot becomes "on the
/// clock" next, for the `pick-started` payload.
async fn next_open_slot(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
) -> DomainResult<Option<OpenSlot>> {
    let row = sqlx::query_as!(
        OpenSlot,
        r#"
        SELECT id, round, pick_in_round, overall_pick, team_id
        FROM draft_picks
        WHERE draft_id = $1 AND player_id IS NULL
        ORDER BY overall_pick ASC
        LIMIT 1
        "#,
        draft_id
    )
    .fetch_optional(&mut **tx)
    .await
    .map_err(DbError::DatabaseError)?;

    Ok(row)
}

/// Advances the deadline or completes the draft, whichever the remaining
/// open-pick count calls for, and emits the matching lifecycle event. When
/// the deadline advances rather than the draft completing, also emits
/// `pick-started` for the slot now on the clock, so the Gateway's
/// projection learns the new `timeout_at`.
async fn advance_or_complete(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
    settings: &DraftSettings,
) -> DomainResult<bool> {
    let remaining = sqlx::query!(
        r#"SELECT count(*) as "count!" FROM draft_picks WHERE draft_id = $1 AND player_id IS NULL"#,
        draft_id
    )
    .fetch_one(&mut **tx)
    .await
    .map_err(DbError::DatabaseError)?
    .count;

    let now = Utc::now();

    if remaining == 0 {
        sqlx::query!(
            r#"
            UPDATE drafts
            SET status = 'Completed', next_deadline = NULL, completed_at = $2, updated_at = $2
            WHERE id = $1
            "#,
            draft_id,
            now,
        )
        .execute(&mut **tx)
        .await
        .map_err(DbError::DatabaseError)?;

        insert_outbox(tx, draft_id, EventKind::DraftCompleted, payload::draft_lifecycle(draft_id)).await?;
        Ok(true)
    } else {
        let next_deadline = now + chrono::Duration::seconds(settings.time_per_pick_secs as i64);
        sqlx::query!(
            "UPDATE drafts SET next_deadline = $2, updated_at = $3 WHERE id = $1",
            draft_id,
            next_deadline,
            now,
        )
        .execute(&mut **tx)
        .await
        .map_err(DbError::DatabaseError)?;

        if let Some(slot) = next_open_slot(tx, draft_id).await? {
            insert_outbox(
                tx,
                draft_id,
                EventKind::PickStarted,
                payload::pick_started(slot.id, slot.team_id, slot.overall_pick, slot.round, slot.pick_in_round, next_deadline),
            )
            .await?;
        }

        Ok(false)
    }
}

#[async_trait]
impl CommitProtocol for SqlxCommitProtocol {
    async fn commit_user_pick(
        &self,
        draft_id: Uuid,
        pick_id: Uuid,
        team_id: Uuid,
        player_id: Uuid,
    ) -> DomainResult<CommitOutcome> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let settings = lock_draft_in_progress(&mut tx, draft_id).await?;
        let now = Utc::now();

        let claimed = sqlx::query!(
            r#"
            UPDATE draft_picks
            SET player_id = $4, picked_at = $5
            WHERE id = $1 AND draft_id = $2 AND team_id = $3 AND player_id IS NULL
            RETURNING round, pick_in_round, overall_pick
            "#,
            pick_id,
            draft_id,
            team_id,
            player_id,
            now,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        let claimed = match claimed {
            Some(row) => row,
            None => return Err(diagnose_claim_failure(&mut tx, draft_id, pick_id, team_id).await),
        };

        insert_outbox(
            &mut tx,
            draft_id,
            EventKind::PickMade,
            payload::pick_made(
                pick_id,
                player_id,
                team_id,
                claimed.overall_pick,
                claimed.round,
                claimed.pick_in_round,
                now,
            ),
        )
        .await?;

        let draft_completed = advance_or_complete(&mut tx, draft_id, &settings).await?;

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(CommitOutcome {
            pick_id,
            overall_pick: claimed.overall_pick,
            draft_completed,
        })
    }

    async fn commit_auto_pick(
        &self,
        draft_id: Uuid,
        player_id: Uuid,
    ) -> DomainResult<Option<CommitOutcome>> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let settings = lock_draft_in_progress(&mut tx, draft_id).await?;
        let now = Utc::now();

        let open = sqlx::query!(
            r#"
            SELECT id, round, pick_in_round, team_id
            FROM draft_picks
            WHERE draft_id = $1 AND player_id IS NULL
            ORDER BY overall_pick ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
            draft_id
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        let open = match open {
            Some(row) => row,
            None => return Ok(None),
        };

        let claimed = sqlx::query!(
            r#"
            UPDATE draft_picks
            SET player_id = $2, picked_at = $3
            WHERE id = $1
            RETURNING overall_pick
            "#,
            open.id,
            player_id,
            now,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        insert_outbox(
            &mut tx,
            draft_id,
            EventKind::PickMade,
            payload::pick_made(
                open.id,
                player_id,
                open.team_id,
                claimed.overall_pick,
                open.round,
                open.pick_in_round,
                now,
            ),
        )
        .await?;

        let draft_completed = advance_or_complete(&mut tx, draft_id, &settings).await?;

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(Some(CommitOutcome {
            pick_id: open.id,
            overall_pick: claimed.overall_pick,
            draft_completed,
        }))
    }

    async fn start_draft(&self, draft: Draft, picks: Vec<DraftPick>) -> DomainResult<Draft> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;

        let status = sqlx::query_scalar!("SELECT status FROM drafts WHERE id = $1 FOR UPDATE", draft.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::DatabaseError)?
            .ok_or_else(|| DomainError::NotFound(format!("draft {} not found", draft.id)))?;

        if status != "NotStarted" {
            return Err(DomainError::InvalidState(format!(
                "cannot start draft {} in state {status}",
                draft.id
            )));
        }

        for pick in &picks {
            sqlx::query!(
                r#"
                INSERT INTO draft_picks
                    (id, draft_id, round, pick_in_round, overall_pick, team_id, player_id, picked_at, auction_amount, is_keeper)
                VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL, NULL, FALSE)
                "#,
                pick.id,
                pick.draft_id,
                pick.round,
                pick.pick_in_round,
                pick.overall_pick,
                pick.team_id,
            )
            .execute(&mut *tx)
            .await
            .map_err(DbError::DatabaseError)?;
        }

        sqlx::query!(
            r#"
            UPDATE drafts
            SET status = 'InProgress', next_deadline = $2, started_at = $3, updated_at = $3
            WHERE id = $1
            "#,
            draft.id,
            draft.next_deadline,
            draft.started_at,
        )
        .execute(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        insert_outbox(
            &mut tx,
            draft.id,
            EventKind::DraftStarted,
            payload::draft_started(draft.id, picks.len() as i32),
        )
        .await?;

        if let Some(first) = picks.iter().min_by_key(|p| p.overall_pick) {
            if let Some(deadline) = draft.next_deadline {
                insert_outbox(
                    &mut tx,
                    draft.id,
                    EventKind::PickStarted,
                    payload::pick_started(first.id, first.team_id, first.overall_pick, first.round, first.pick_in_round, deadline),
                )
                .await?;
            }
        }

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(draft)
    }

    async fn pause_draft(&self, draft_id: Uuid) -> DomainResult<Draft> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let row = lock_draft_row(&mut tx, draft_id).await?;

        if row.status != "InProgress" {
            return Err(
                DbError::DraftNotInProgress(format!("draft {draft_id} is {}", row.status)).into(),
            );
        }

        let now = Utc::now();
        sqlx::query!(
            "UPDATE drafts SET status = 'Paused', next_deadline = NULL, updated_at = $2 WHERE id = $1",
            draft_id,
            now,
        )
        .execute(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        insert_outbox(&mut tx, draft_id, EventKind::DraftPaused, payload::draft_lifecycle(draft_id)).await?;
        tx.commit().await.map_err(DbError::DatabaseError)?;

        let mut draft = row.to_domain().map_err(|e| DomainError::InternalError(e.to_string()))?;
        draft.pause(now).map_err(|_| {
            DomainError::InternalError("pause succeeded in storage but not in memory".to_string())
        })?;
        Ok(draft)
    }

    async fn resume_draft(&self, draft_id: Uuid) -> DomainResult<Draft> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let row = lock_draft_row(&mut tx, draft_id).await?;

        if row.status != "Paused" {
            return Err(DomainError::InvalidState(format!(
                "cannot resume draft {draft_id} in state {}",
                row.status
            )));
        }

        let mut draft = row.to_domain().map_err(|e| DomainError::InternalError(e.to_string()))?;
        let now = Utc::now();
        draft.resume(now).map_err(|_| {
            DomainError::InternalError("resume rejected by in-memory state machine".to_string())
        })?;

        sqlx::query!(
            "UPDATE drafts SET status = 'InProgress', next_deadline = $2, updated_at = $3 WHERE id = $1",
            draft_id,
            draft.next_deadline,
            now,
        )
        .execute(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        insert_outbox(&mut tx, draft_id, EventKind::DraftResumed, payload::draft_lifecycle(draft_id)).await?;

        if let Some(slot) = next_open_slot(&mut tx, draft_id).await? {
            if let Some(deadline) = draft.next_deadline {
                insert_outbox(
                    &mut tx,
                    draft_id,
                    EventKind::PickStarted,
                    payload::pick_started(slot.id, slot.team_id, slot.overall_pick, slot.round, slot.pick_in_round, deadline),
                )
                .await?;
            }
        }

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(draft)
    }

    async fn handle_pick_exhaustion(&self, draft_id: Uuid) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let settings = lock_draft_in_progress(&mut tx, draft_id).await?;

        let draft_completed = advance_or_complete(&mut tx, draft_id, &settings).await?;

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(draft_completed)
    }
}

async fn lock_draft_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
) -> DomainResult<DraftDb> {
    sqlx::query_as!(
        DraftDb,
        r#"SELECT id, league_id, draft_type, status, settings, next_deadline,
                  created_at, updated_at, scheduled_at, started_at, completed_at
           FROM drafts WHERE id = $1 FOR UPDATE"#,
        draft_id
    )
    .fetch_optional(&mut **tx)
    .await
    .map_err(DbError::DatabaseError)?
    .ok_or_else(|| DomainError::NotFound(format!("draft {draft_id} not found")))
}

/// Distinguishes why the claiming UPDATE affected zero rows, for a
/// meaningful error back to the RPC caller. Runs in the same transaction so
/// the diagnosis is consistent with the failed claim.
async fn diagnose_claim_failure(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft_id: Uuid,
    pick_id: Uuid,
    team_id: Uuid,
) -> DomainError {
    let row = sqlx::query!(
        r#"SELECT draft_id, team_id, player_id FROM draft_picks WHERE id = $1"#,
        pick_id
    )
    .fetch_optional(&mut **tx)
    .await
    .ok()
    .flatten();

    match row {
        None => DbError::NotFound(format!("pick {pick_id} not found")).into(),
        Some(row) if row.draft_id != draft_id || row.team_id != team_id => {
            DbError::NotFound(format!("pick {pick_id} does not belong to draft {draft_id}/team {team_id}")).into()
        }
        Some(row) if row.player_id.is_some() => {
            DbError::AlreadyPicked(format!("pick {pick_id} already claimed")).into()
        }
        Some(_) => DbError::MappingError("unexplained claim failure".to_string()).into(),
    }
}
