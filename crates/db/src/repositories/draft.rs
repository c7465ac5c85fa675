use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::DomainResult;
use domain::models::{Draft, DraftStatus};
use domain::repositories::{DraftRepository, DueDraft};

use crate::errors::DbError;
use crate::models::DraftDb;

/// How far `fetch_drafts_due_for_pick` pushes a claimed draft's deadline out
/// while its timeout handler runs. Holds the row under `FOR UPDATE SKIP
/// LOCKED` for the claiming UPDATE only, not for the handler's full
/// lifetime; the claim is provisional, since a successful commit or
/// `CommitProtocol::handle_pick_exhaustion` overwrites it with the real
/// next deadline before this lease would expire.
const CLAIM_LEASE_SECS: i64 = 30;

pub struct SqlxDraftRepository {
    pool: PgPool,
}

impl SqlxDraftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftRepository for SqlxDraftRepository {
    async fn create(&self, draft: &Draft) -> DomainResult<Draft> {
        let draft_db = DraftDb::from_domain(draft)?;

        let result = sqlx::query_as!(
            DraftDb,
            r#"
            INSERT INTO drafts (
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            "#,
            draft_db.id,
            draft_db.league_id,
            draft_db.draft_type,
            draft_db.status,
            draft_db.settings,
            draft_db.next_deadline,
            draft_db.created_at,
            draft_db.updated_at,
            draft_db.scheduled_at,
            draft_db.started_at,
            draft_db.completed_at,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        result.to_domain().map_err(Into::into)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Draft>> {
        let result = sqlx::query_as!(
            DraftDb,
            r#"
            SELECT
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            FROM drafts
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        match result {
            Some(draft_db) => Ok(Some(draft_db.to_domain()?)),
            None => Ok(None),
        }
    }

    async fn find_by_status(&self, status: DraftStatus) -> DomainResult<Vec<Draft>> {
        let status_str = status.to_string();
        let results = sqlx::query_as!(
            DraftDb,
            r#"
            SELECT
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            FROM drafts
            WHERE status = $1
            ORDER BY created_at DESC
            "#,
            status_str
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        results
            .into_iter()
            .map(|db| db.to_domain())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn find_all(&self) -> DomainResult<Vec<Draft>> {
        let results = sqlx::query_as!(
            DraftDb,
            r#"
            SELECT
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            FROM drafts
            ORDER BY created_at DESC
            "#
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        results
            .into_iter()
            .map(|db| db.to_domain())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn update(&self, draft: &Draft) -> DomainResult<Draft> {
        let draft_db = DraftDb::from_domain(draft)?;

        let result = sqlx::query_as!(
            DraftDb,
            r#"
            UPDATE drafts
            SET status = $2,
                settings = $3,
                next_deadline = $4,
                updated_at = $5,
                started_at = $6,
                completed_at = $7
            WHERE id = $1
            RETURNING
                id, league_id, draft_type, status, settings, next_deadline,
                created_at, updated_at, scheduled_at, started_at, completed_at
            "#,
            draft_db.id,
            draft_db.status,
            draft_db.settings,
            draft_db.next_deadline,
            draft_db.updated_at,
            draft_db.started_at,
            draft_db.completed_at,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?
        .ok_or_else(|| DbError::NotFound(format!("draft {} not found", draft_db.id)))?;

        result.to_domain().map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query!("DELETE FROM drafts WHERE id = $1", id)
            .execute(&self.pool)
            .await
            .map_err(DbError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("draft {id} not found")).into());
        }

        Ok(())
    }

    async fn fetch_next_deadline(&self) -> DomainResult<Option<DueDraft>> {
        let row = sqlx::query!(
            r#"
            SELECT id, next_deadline as "next_deadline!"
            FROM drafts
            WHERE status = 'InProgress' AND next_deadline IS NOT NULL
            ORDER BY next_deadline ASC
            LIMIT 1
            "#
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(row.map(|row| DueDraft {
            draft_id: row.id,
            deadline: row.next_deadline,
        }))
    }

    async fn fetch_drafts_due_for_pick(&self, limit: i64) -> DomainResult<Vec<DueDraft>> {
        // The select and the claiming UPDATE must share one transaction:
        // `FOR UPDATE SKIP LOCKED` only holds its row locks for the
        // lifetime of the enclosing transaction, and a bare `.fetch_all`
        // with no `pool.begin()` commits (and releases locks) the instant
        // the SELECT itself completes, before the caller ever sees the
        // rows. Pushing `next_deadline` out by `CLAIM_LEASE_SECS` inside
        // the same transaction is the actual claim other replicas observe.
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;

        let rows = sqlx::query!(
            r#"
            SELECT id, next_deadline as "next_deadline!"
            FROM drafts
            WHERE status = 'InProgress'
              AND next_deadline IS NOT NULL
              AND next_deadline <= now()
            ORDER BY next_deadline ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
            limit
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::DatabaseError)?;

        let now = Utc::now();
        let lease_until = now + chrono::Duration::seconds(CLAIM_LEASE_SECS);
        for row in &rows {
            sqlx::query!(
                "UPDATE drafts SET next_deadline = $2, updated_at = $3 WHERE id = $1",
                row.id,
                lease_until,
                now,
            )
            .execute(&mut *tx)
            .await
            .map_err(DbError::DatabaseError)?;
        }

        tx.commit().await.map_err(DbError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|row| DueDraft {
                draft_id: row.id,
                deadline: row.next_deadline,
            })
            .collect())
    }

    async fn update_next_deadline(
        &self,
        draft_id: Uuid,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
    ) -> DomainResult<()> {
        sqlx::query!(
            "UPDATE drafts SET next_deadline = $2, updated_at = now() WHERE id = $1",
            draft_id,
            deadline
        )
        .execute(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(())
    }
}
