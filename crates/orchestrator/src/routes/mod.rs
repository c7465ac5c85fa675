use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    create_router_with_cors(state, &[])
}

pub fn create_router_with_cors(state: AppState, cors_origins: &[String]) -> Router {
    let allowed_methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let allowed_headers = [CONTENT_TYPE, AUTHORIZATION];

    let cors = if cors_origins.is_empty() {
        let origins: Vec<HeaderValue> = [
            "http://localhost:5173",
            "http://localhost:3000",
            "http://localhost:8080",
        ]
        .iter()
        .map(|o| o.parse().unwrap())
        .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
    } else {
        let origins: Vec<HeaderValue> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
    };

    let api_routes = Router::new()
        .route(
            "/drafts",
            get(handlers::draft::list_drafts).post(handlers::draft::create_draft),
        )
        .route(
            "/drafts/{id}",
            get(handlers::draft::get_draft)
                .put(handlers::draft::update_draft)
                .delete(handlers::draft::delete_draft),
        )
        .route("/drafts/{id}/start", post(handlers::draft::start_draft))
        .route("/drafts/{id}/pause", post(handlers::draft::pause_draft))
        .route("/drafts/{id}/resume", post(handlers::draft::resume_draft))
        .route(
            "/drafts/{id}/next-deadline",
            get(handlers::draft::fetch_next_deadline),
        )
        .route("/drafts/{id}/picks", get(handlers::draft_pick::get_draft_picks_by_draft))
        .route(
            "/drafts/{id}/picks/next",
            get(handlers::draft_pick::get_next_pick_for_draft),
        )
        .route(
            "/drafts/{id}/picks/remaining",
            get(handlers::draft_pick::count_remaining_picks),
        )
        .route(
            "/drafts/{id}/rounds/{round}/picks",
            get(handlers::draft_pick::get_draft_picks_by_round),
        )
        .route("/drafts/{id}/picks/make", post(handlers::draft::make_pick));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
