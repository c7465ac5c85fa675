use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::DomainResult;
use domain::events::OutboxRow;
use domain::repositories::OutboxRepository;

use crate::errors::DbError;
use crate::models::OutboxDb;

pub struct SqlxOutboxRepository {
    pool: PgPool,
}

impl SqlxOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxRepository for SqlxOutboxRepository {
    async fn fetch_unsent(&self, limit: i64) -> DomainResult<Vec<OutboxRow>> {
        let results = sqlx::query_as!(
            OutboxDb,
            r#"
            SELECT id, draft_id, kind, payload, created_at, sent_at, attempts
            FROM outbox
            WHERE sent_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
            limit
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

    async fn mark_sent(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query!(
            "UPDATE outbox SET sent_at = now(), attempts = attempts + 1 WHERE id = $1",
            id
        )
        .execute(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(())
    }
}
