use utoipa::OpenApi;

use crate::handlers::{draft, draft_pick, health};
use domain::models::{AuctionSettings, DraftSettings, DraftStatus, DraftType};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Draft Orchestration Core API",
        version = "0.1.0",
        description = "Deadline scheduling, pick commit protocol, and outbox relay for fantasy sports drafts",
        contact(
            name = "Draft Orchestration Team",
            email = "team@draft-orchestration.example.com"
        )
    ),
    paths(
        // Health
        health::health_check,

        // Drafts
        draft::create_draft,
        draft::list_drafts,
        draft::get_draft,
        draft::update_draft,
        draft::delete_draft,
        draft::start_draft,
        draft::pause_draft,
        draft::resume_draft,
        draft::fetch_next_deadline,

        // Picks
        draft::make_pick,
        draft_pick::get_next_pick_for_draft,
        draft_pick::count_remaining_picks,
        draft_pick::get_draft_picks_by_draft,
        draft_pick::get_draft_picks_by_round,
    ),
    components(
        schemas(
            // Domain models
            DraftStatus,
            DraftType,
            DraftSettings,
            AuctionSettings,

            // Draft types
            draft::DraftResponse,
            draft::CreateDraftRequest,
            draft::UpdateDraftRequest,
            draft::MakePickRequest,
            draft::MakePickResponse,
            draft::NextDeadlineResponse,

            // Pick types
            draft_pick::DraftPickResponse,
            draft_pick::RemainingPicksResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "drafts", description = "Draft lifecycle management"),
        (name = "picks", description = "Draft pick commit and query operations"),
    )
)]
pub struct ApiDoc;
