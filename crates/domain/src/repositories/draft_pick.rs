use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::DraftPick;

#[async_trait]
pub trait DraftPickRepository: Send + Sync {
    /// Pre-populate every slot for a draft in a single batch, per creation.
    async fn create_many(&self, picks: &[DraftPick]) -> DomainResult<Vec<DraftPick>>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<DraftPick>>;

    async fn find_by_draft_id(&self, draft_id: Uuid) -> DomainResult<Vec<DraftPick>>;

    async fn find_by_draft_and_round(
        &self,
        draft_id: Uuid,
        round: i32,
    ) -> DomainResult<Vec<DraftPick>>;

    /// The open slot with the smallest `overall_pick` for this draft, or
    /// `None` if every slot is closed.
    async fn find_next_open_pick(&self, draft_id: Uuid) -> DomainResult<Option<DraftPick>>;

    async fn count_remaining(&self, draft_id: Uuid) -> DomainResult<i64>;

    async fn delete_by_draft_id(&self, draft_id: Uuid) -> DomainResult<()>;
}
