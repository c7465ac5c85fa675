use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainResult;

/// Narrow contract onto the out-of-scope roster/player collaborator: the
/// Auto-Pick Strategy needs *a* source of not-yet-picked players and nothing
/// more. A real deployment wires this to the roster service; this workspace
/// ships one thin reference-table-backed implementation in `db`.
#[async_trait]
pub trait AvailablePlayerPool: Send + Sync {
    /// Players eligible for `draft_id` that no slot has claimed yet.
    async fn available_players(&self, draft_id: Uuid) -> DomainResult<Vec<Uuid>>;
}
