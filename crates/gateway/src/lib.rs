pub mod config;
pub mod consumer;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod projection;
pub mod state;
pub mod subscription;
pub mod ws;

pub use config::Config;
pub use consumer::EventConsumer;
pub use state::GatewayState;

use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// The Gateway's HTTP/WebSocket surface (§6), independent of `main.rs` so
/// integration tests can mount it without a running bus consumer.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/drafts/active", get(handlers::list_active_drafts))
        .route("/api/drafts/{id}/state", get(handlers::get_draft_state))
        .route("/api/drafts/{id}/picks", get(handlers::get_draft_picks))
        .route("/ws/draft", get(handlers::ws_upgrade))
        .route("/ws/stats", get(handlers::connection_stats))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
