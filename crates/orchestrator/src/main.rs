use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use db::repositories::{
    SqlxAvailablePlayerPool, SqlxCommitProtocol, SqlxDraftPickRepository, SqlxDraftRepository,
    SqlxOutboxRepository,
};
use domain::clock::SystemClock;
use domain::commit::CommitProtocol;
use domain::repositories::{AvailablePlayerPool, DraftRepository};
use domain::services::{
    OutboxRelay, OutboxRelayConfig, SchedulerConfig, SchedulerLoop, UniformRandomAutoPick,
};
use orchestrator::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting draft orchestrator");
    tracing::info!("Server will listen on: {}", config.server_address());

    let pool = db::create_pool(&config.database.url).await?;
    tracing::info!("Database connection pool created");

    let jetstream = bus::connect(&config.bus.url).await?;
    tracing::info!("Connected to NATS JetStream");
    let publisher = Arc::new(bus::NatsEventPublisher::new(jetstream));

    let draft_repo: Arc<dyn DraftRepository> = Arc::new(SqlxDraftRepository::new(pool.clone()));
    let outbox_repo = Arc::new(SqlxOutboxRepository::new(pool.clone()));
    let player_pool: Arc<dyn AvailablePlayerPool> = Arc::new(SqlxAvailablePlayerPool::new(pool.clone()));
    let commit: Arc<dyn CommitProtocol> = Arc::new(SqlxCommitProtocol::new(pool.clone()));
    let auto_pick = Arc::new(UniformRandomAutoPick::new(player_pool.clone()));

    let (scheduler_loop, scheduler_wake) = SchedulerLoop::new(
        draft_repo.clone(),
        commit.clone(),
        auto_pick.clone(),
        Arc::new(SystemClock),
        SchedulerConfig::default(),
    );

    let state = AppState::new(pool, scheduler_wake, config.default_time_per_pick_secs);

    let shutdown = CancellationToken::new();

    let scheduler_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler_loop.run(shutdown).await })
    };

    let outbox_relay = OutboxRelay::new(outbox_repo, publisher, OutboxRelayConfig::default());
    let relay_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { outbox_relay.run(shutdown).await })
    };

    let app = orchestrator::routes::create_router_with_cors(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server listening on {}", config.server_address());

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = scheduler_handle.await;
    let _ = relay_handle.await;

    Ok(())
}
