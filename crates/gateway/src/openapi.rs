use utoipa::OpenApi;

use crate::handlers;
use crate::projection::{CurrentPick, DraftProjection, PickRecord};
use domain::models::DraftStatus;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Draft Event Gateway API",
        version = "0.1.0",
        description = "Point-in-time draft state snapshots and the WebSocket event stream",
        contact(
            name = "Draft Orchestration Team",
            email = "team@draft-orchestration.example.com"
        )
    ),
    paths(
        handlers::list_active_drafts,
        handlers::get_draft_state,
        handlers::get_draft_picks,
        handlers::ws_upgrade,
        handlers::connection_stats,
    ),
    components(
        schemas(
            DraftStatus,
            CurrentPick,
            DraftProjection,
            PickRecord,
            handlers::DraftSummaryResponse,
            handlers::DraftStateResponse,
            handlers::PicksPageResponse,
            handlers::ConnectionStatsResponse,
        )
    ),
    tags(
        (name = "drafts", description = "Projected draft state and pick history"),
        (name = "connections", description = "WebSocket upgrade and connection stats"),
    )
)]
pub struct ApiDoc;
