use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway::{Config, EventConsumer, GatewayState};

const DURABLE_CONSUMER_NAME: &str = "gateway-draft-events";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting event gateway");
    tracing::info!("Server will listen on: {}", config.server_address());

    let jetstream = bus::connect(&config.bus.url).await?;
    tracing::info!("Connected to NATS JetStream");
    let nats_consumer = bus::NatsEventConsumer::new(&jetstream, DURABLE_CONSUMER_NAME).await?;

    let state = GatewayState::new(config.require_user_id);
    let event_consumer = EventConsumer::new(nats_consumer, state.projections.clone(), state.subscriptions.clone());

    let shutdown = CancellationToken::new();

    let consumer_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { event_consumer.run(shutdown).await })
    };

    let app = gateway::create_router(state);

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
    let _ = consumer_handle.await;

    Ok(())
}
