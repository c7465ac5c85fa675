use async_trait::async_trait;

use crate::errors::DomainResult;
use crate::events::OutboxRow;

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Unsent rows in commit order (ascending `created_at`, tiebroken by
    /// `id`), claimed with `FOR UPDATE SKIP LOCKED` so a second Relay
    /// instance never republishes the same row.
    async fn fetch_unsent(&self, limit: i64) -> DomainResult<Vec<OutboxRow>>;

    async fn mark_sent(&self, id: uuid::Uuid) -> DomainResult<()>;
}
