use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::DomainResult;
use domain::models::DraftPick;
use domain::repositories::DraftPickRepository;

use crate::errors::DbError;
use crate::models::DraftPickDb;

pub struct SqlxDraftPickRepository {
    pool: PgPool,
}

impl SqlxDraftPickRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftPickRepository for SqlxDraftPickRepository {
    async fn create_many(&self, picks: &[DraftPick]) -> DomainResult<Vec<DraftPick>> {
        let mut tx = self.pool.begin().await.map_err(DbError::DatabaseError)?;
        let mut created = Vec::with_capacity(picks.len());

        for pick in picks {
            let pick_db = DraftPickDb::from_domain(pick);

            let result = sqlx::query_as!(
                DraftPickDb,
                r#"
                INSERT INTO draft_picks (
                    id, draft_id, round, pick_in_round, overall_pick, team_id,
                    player_id, picked_at, auction_amount, is_keeper
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING
                    id, draft_id, round, pick_in_round, overall_pick, team_id,
                    player_id, picked_at, auction_amount, is_keeper
                "#,
                pick_db.id,
                pick_db.draft_id,
                pick_db.round,
                pick_db.pick_in_round,
                pick_db.overall_pick,
                pick_db.team_id,
                pick_db.player_id,
                pick_db.picked_at,
                pick_db.auction_amount,
                pick_db.is_keeper,
            )
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return DbError::DuplicateEntry(
                            "a pick with this overall_pick already exists for this draft".to_string(),
                        );
                    }
                }
                DbError::DatabaseError(e)
            })?;

            created.push(result.to_domain());
        }

        tx.commit().await.map_err(DbError::DatabaseError)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<DraftPick>> {
        let result = sqlx::query_as!(
            DraftPickDb,
            r#"
            SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                   player_id, picked_at, auction_amount, is_keeper
            FROM draft_picks
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(result.map(|db| db.to_domain()))
    }

    async fn find_by_draft_id(&self, draft_id: Uuid) -> DomainResult<Vec<DraftPick>> {
        let results = sqlx::query_as!(
            DraftPickDb,
            r#"
            SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                   player_id, picked_at, auction_amount, is_keeper
            FROM draft_picks
            WHERE draft_id = $1
            ORDER BY overall_pick ASC
            "#,
            draft_id
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(results.into_iter().map(|db| db.to_domain()).collect())
    }

    async fn find_by_draft_and_round(
        &self,
        draft_id: Uuid,
        round: i32,
    ) -> DomainResult<Vec<DraftPick>> {
        let results = sqlx::query_as!(
            DraftPickDb,
            r#"
            SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                   player_id, picked_at, auction_amount, is_keeper
            FROM draft_picks
            WHERE draft_id = $1 AND round = $2
            ORDER BY pick_in_round ASC
            "#,
            draft_id,
            round
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(results.into_iter().map(|db| db.to_domain()).collect())
    }

    async fn find_next_open_pick(&self, draft_id: Uuid) -> DomainResult<Option<DraftPick>> {
        let result = sqlx::query_as!(
            DraftPickDb,
            r#"
            SELECT id, draft_id, round, pick_in_round, overall_pick, team_id,
                   player_id, picked_at, auction_amount, is_keeper
            FROM draft_picks
            WHERE draft_id = $1 AND player_id IS NULL
            ORDER BY overall_pick ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
            draft_id
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(result.map(|db| db.to_domain()))
    }

    async fn count_remaining(&self, draft_id: Uuid) -> DomainResult<i64> {
        let row = sqlx::query!(
            r#"SELECT count(*) as "count!" FROM draft_picks WHERE draft_id = $1 AND player_id IS NULL"#,
            draft_id
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::DatabaseError)?;

        Ok(row.count)
    }

    async fn delete_by_draft_id(&self, draft_id: Uuid) -> DomainResult<()> {
        sqlx::query!("DELETE FROM draft_picks WHERE draft_id = $1", draft_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::DatabaseError)?;

        Ok(())
    }
}
