use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::{Draft, DraftStatus};

/// Due-draft entry returned by `fetch_drafts_due_for_pick`: the caller only
/// needs the id to dispatch a timeout handler, but carrying the deadline lets
/// the scheduler log lateness without a second round-trip.
#[derive(Debug, Clone, Copy)]
pub struct DueDraft {
    pub draft_id: Uuid,
    pub deadline: DateTime<Utc>,
}

#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn create(&self, draft: &Draft) -> DomainResult<Draft>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Draft>>;

    async fn find_by_status(&self, status: DraftStatus) -> DomainResult<Vec<Draft>>;

    async fn find_all(&self) -> DomainResult<Vec<Draft>>;

    async fn update(&self, draft: &Draft) -> DomainResult<Draft>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Earliest future deadline across all in-progress drafts, or `None` if
    /// none exists. Used exclusively by the Scheduler Loop.
    async fn fetch_next_deadline(&self) -> DomainResult<Option<DueDraft>>;

    /// Up to `limit` drafts whose `next_deadline <= now` and
    /// `status = in-progress`, claimed with row-level `FOR UPDATE SKIP
    /// LOCKED` so concurrent scheduler replicas never return the same draft.
    async fn fetch_drafts_due_for_pick(&self, limit: i64) -> DomainResult<Vec<DueDraft>>;

    async fn update_next_deadline(
        &self,
        draft_id: Uuid,
        deadline: Option<DateTime<Utc>>,
    ) -> DomainResult<()>;
}
