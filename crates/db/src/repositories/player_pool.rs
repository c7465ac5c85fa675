use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::DomainResult;
use domain::repositories::AvailablePlayerPool;

use crate::errors::DbError;

/// Reads from `draft_players`, a thin reference table this workspace owns
/// in place of the out-of-scope roster/player service: one row per
/// (draft, player) pairing a league-wide player id with the draft it is
/// eligible in. A real deployment would replace this with a call to that
/// service; nothing else in `domain` or `orchestrator` depends on the
/// table's existence.
pub struct SqlxAvailablePlayerPool {
    pool: PgPool,
}

impl SqlxAvailablePlayerPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailablePlayerPool for SqlxAvailablePlayerPool {
    async fn available_players(&self, draft_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let rows = sqlx::query!(
            r#"
            SELECT dp.player_id
            FROM draft_players dp
            WHERE dp.draft_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM draft_picks p
                  WHERE p.draft_id = dp.draft_id AND p.player_id = dp.player_id
              )
            "#,
            draft_id
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(rows.into_iter().map(|row| row.player_id).collect())
    }
}
