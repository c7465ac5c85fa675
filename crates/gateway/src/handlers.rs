//! HTTP/WebSocket handlers for the Gateway's own surface (§6): snapshot
//! reads over the in-memory projection, connection stats, and the
//! WebSocket upgrade. No DB access here — everything is served from
//! `GatewayState`.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::projection::{DraftProjection, PickRecord};
use crate::state::GatewayState;
use crate::ws;

const DEFAULT_PICKS_PAGE_LIMIT: usize = 50;
const MAX_PICKS_PAGE_LIMIT: usize = 200;

#[derive(Debug, Serialize, ToSchema)]
pub struct DraftSummaryResponse {
    pub draft_id: Uuid,
    pub status: domain::models::DraftStatus,
    pub completed_picks: i32,
    pub total_picks: i32,
}

impl From<&DraftProjection> for DraftSummaryResponse {
    fn from(p: &DraftProjection) -> Self {
        Self {
            draft_id: p.draft_id,
            status: p.status,
            completed_picks: p.completed_picks,
            total_picks: p.total_picks,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DraftStateResponse {
    #[serde(flatten)]
    pub projection: DraftProjection,
    pub time_remaining_sec: Option<i64>,
}

/// GET /api/drafts/active - list live draft summaries
#[utoipa::path(
    get,
    path = "/api/drafts/active",
    responses((status = 200, description = "Summaries of drafts currently in-progress or paused", body = Vec<DraftSummaryResponse>)),
    tag = "drafts"
)]
pub async fn list_active_drafts(State(state): State<GatewayState>) -> Json<Vec<DraftSummaryResponse>> {
    let drafts = state.projections.active_drafts().await;
    Json(drafts.iter().map(DraftSummaryResponse::from).collect())
}

/// GET /api/drafts/:id/state - point-in-time projection snapshot
#[utoipa::path(
    get,
    path = "/api/drafts/{id}/state",
    responses(
        (status = 200, description = "Projected draft state, including time remaining on the clock", body = DraftStateResponse),
        (status = 404, description = "No projection exists for this draft")
    ),
    params(("id" = Uuid, Path, description = "Draft ID")),
    tag = "drafts"
)]
pub async fn get_draft_state(
    State(state): State<GatewayState>,
    Path(draft_id): Path<Uuid>,
) -> GatewayResult<Json<DraftStateResponse>> {
    let projection = state
        .projections
        .get(draft_id)
        .await
        .ok_or_else(|| GatewayError::NotFound(format!("no projection for draft {draft_id}")))?;

    let now = Utc::now();
    let time_remaining_sec = projection.time_remaining_sec(now);
    Ok(Json(DraftStateResponse { projection, time_remaining_sec }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PicksQuery {
    pub limit: Option<usize>,
    /// Cursor is the `overall_pick` of the last item seen; picks with a
    /// strictly greater `overall_pick` are returned next.
    pub cursor: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PicksPageResponse {
    pub picks: Vec<PickRecord>,
    pub next_cursor: Option<i32>,
}

/// GET /api/drafts/:id/picks?limit&cursor - cursor-paginated pick history
#[utoipa::path(
    get,
    path = "/api/drafts/{id}/picks",
    responses(
        (status = 200, description = "Page of closed picks, ordered by overall_pick ascending", body = PicksPageResponse),
        (status = 404, description = "No projection exists for this draft")
    ),
    params(("id" = Uuid, Path, description = "Draft ID"), PicksQuery),
    tag = "drafts"
)]
pub async fn get_draft_picks(
    State(state): State<GatewayState>,
    Path(draft_id): Path<Uuid>,
    Query(query): Query<PicksQuery>,
) -> GatewayResult<Json<PicksPageResponse>> {
    let projection = state
        .projections
        .get(draft_id)
        .await
        .ok_or_else(|| GatewayError::NotFound(format!("no projection for draft {draft_id}")))?;

    let limit = query.limit.unwrap_or(DEFAULT_PICKS_PAGE_LIMIT).min(MAX_PICKS_PAGE_LIMIT);

    let mut page: Vec<PickRecord> = projection
        .picks
        .into_iter()
        .filter(|p| match query.cursor {
            Some(cursor) => p.overall_pick > cursor,
            None => true,
        })
        .take(limit + 1)
        .collect();

    let next_cursor = if page.len() > limit {
        page.truncate(limit);
        page.last().map(|p| p.overall_pick)
    } else {
        None
    };

    Ok(Json(PicksPageResponse { picks: page, next_cursor }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionStatsResponse {
    pub total_connections: usize,
    pub drafts_with_subscribers: usize,
}

/// GET /ws/stats - connection statistics
#[utoipa::path(
    get,
    path = "/ws/stats",
    responses((status = 200, description = "Live connection and subscription counts", body = ConnectionStatsResponse)),
    tag = "connections"
)]
pub async fn connection_stats(State(state): State<GatewayState>) -> Json<ConnectionStatsResponse> {
    Json(ConnectionStatsResponse {
        total_connections: state.subscriptions.total_connections(),
        drafts_with_subscribers: state.subscriptions.total_drafts_with_subscribers().await,
    })
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WsUpgradeQuery {
    pub draft_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// GET /ws/draft?draft_id=&user_id= - upgrade to a WebSocket event stream
/// for one draft. Not invokable through Swagger UI itself (it is a
/// protocol upgrade, not a plain response), documented here for discovery.
#[utoipa::path(
    get,
    path = "/ws/draft",
    responses(
        (status = 101, description = "Switching Protocols: upgraded to WebSocket"),
        (status = 400, description = "Missing/invalid draft_id, or missing user_id when required")
    ),
    params(WsUpgradeQuery),
    tag = "connections"
)]
pub async fn ws_upgrade(
    State(state): State<GatewayState>,
    Query(query): Query<WsUpgradeQuery>,
    ws: WebSocketUpgrade,
) -> GatewayResult<Response> {
    let draft_id = query
        .draft_id
        .ok_or_else(|| GatewayError::BadRequest("draft_id is required".to_string()))?;

    if state.require_user_id && query.user_id.is_none() {
        return Err(GatewayError::BadRequest(
            "user_id is required in this environment".to_string(),
        ));
    }

    let subscriptions = state.subscriptions.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        ws::handle_socket(socket, draft_id, subscriptions).await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GatewayState;
    use domain::events::{payload, EventEnvelope, EventKind};

    fn envelope(draft_id: Uuid, kind: EventKind, data: serde_json::Value) -> EventEnvelope {
        EventEnvelope { id: Uuid::new_v4(), draft_id, kind, timestamp: Utc::now(), data }
    }

    #[tokio::test]
    async fn unknown_draft_state_returns_not_found() {
        let state = GatewayState::new(false);
        let result = get_draft_state(State(state), Path(Uuid::new_v4())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn active_drafts_lists_only_in_progress_and_paused() {
        let state = GatewayState::new(false);
        let draft_id = Uuid::new_v4();
        state
            .projections
            .apply(&envelope(draft_id, EventKind::DraftStarted, payload::draft_lifecycle(draft_id)))
            .await;

        let Json(summaries) = list_active_drafts(State(state)).await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].draft_id, draft_id);
    }

    #[tokio::test]
    async fn picks_page_paginates_by_overall_pick_cursor() {
        let state = GatewayState::new(false);
        let draft_id = Uuid::new_v4();
        let now = Utc::now();

        for overall_pick in 1..=5 {
            state
                .projections
                .apply(&envelope(
                    draft_id,
                    EventKind::PickMade,
                    payload::pick_made(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), overall_pick, 1, overall_pick, now),
                ))
                .await;
        }

        let first_page = get_draft_picks(
            State(state.clone()),
            Path(draft_id),
            Query(PicksQuery { limit: Some(2), cursor: None }),
        )
        .await
        .unwrap();
        assert_eq!(first_page.0.picks.len(), 2);
        assert_eq!(first_page.0.next_cursor, Some(2));

        let second_page = get_draft_picks(
            State(state),
            Path(draft_id),
            Query(PicksQuery { limit: Some(2), cursor: first_page.0.next_cursor }),
        )
        .await
        .unwrap();
        assert_eq!(second_page.0.picks.len(), 2);
        assert_eq!(second_page.0.picks[0].overall_pick, 3);
    }
}
