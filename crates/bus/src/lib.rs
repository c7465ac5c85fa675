//! Message bus integration for the `DRAFT_EVENTS` JetStream stream (§6):
//! one durable stream, subjects `draft.events.<draft_id>`, consumed with the
//! filter `draft.events.>`. `domain` only knows the narrow `BusPublisher`
//! trait; this crate is the one place that talks `async-nats`.

use std::future::Future;
use std::time::Duration;

use async_nats::jetstream::{self, consumer::pull, stream};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error, warn};

use domain::errors::{DomainError, DomainResult};
use domain::events::{EventEnvelope, STREAM_NAME, SUBJECT_FILTER};
use domain::services::outbox_relay::BusPublisher;

/// Redeliveries allowed before a message is routed to the dead-letter
/// subject instead of handed to `on_event` again.
const MAX_DELIVER: i64 = 5;

/// Subject dead-lettered payloads are republished to. Deliberately outside
/// `SUBJECT_FILTER`'s `draft.events.>` wildcard so a dead-lettered message
/// is never re-pulled by this same consumer.
const DEAD_LETTER_SUBJECT: &str = "draft.dead-letter";
const DEAD_LETTER_STREAM_NAME: &str = "DRAFT_EVENTS_DLQ";

/// Connects to NATS and ensures the `DRAFT_EVENTS` stream exists, creating
/// it on first boot. Idempotent: running this against an already-provisioned
/// stream is a no-op.
pub async fn connect(nats_url: &str) -> DomainResult<jetstream::Context> {
    let client = async_nats::connect(nats_url)
        .await
        .map_err(|err| DomainError::TransientIo(format!("nats connect failed: {err}")))?;
    let js = jetstream::new(client);

    js.get_or_create_stream(stream::Config {
        name: STREAM_NAME.to_string(),
        subjects: vec![SUBJECT_FILTER.to_string()],
        ..Default::default()
    })
    .await
    .map_err(|err| DomainError::TransientIo(format!("nats stream setup failed: {err}")))?;

    js.get_or_create_stream(stream::Config {
        name: DEAD_LETTER_STREAM_NAME.to_string(),
        subjects: vec![DEAD_LETTER_SUBJECT.to_string()],
        ..Default::default()
    })
    .await
    .map_err(|err| DomainError::TransientIo(format!("nats dead-letter stream setup failed: {err}")))?;

    Ok(js)
}

pub struct NatsEventPublisher {
    jetstream: jetstream::Context,
}

impl NatsEventPublisher {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl BusPublisher for NatsEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> DomainResult<()> {
        let subject = domain::events::subject_for_draft(envelope.draft_id);
        let payload = envelope
            .to_json()
            .map_err(|err| DomainError::InternalError(format!("envelope serialization failed: {err}")))?;

        let ack = self
            .jetstream
            .publish(subject, payload.into())
            .await
            .map_err(|err| DomainError::TransientIo(format!("nats publish failed: {err}")))?;

        ack.await
            .map_err(|err| DomainError::TransientIo(format!("nats publish not acked: {err}")))?;

        Ok(())
    }
}

/// A durable pull consumer over the `DRAFT_EVENTS` stream. The Event Gateway
/// owns one of these per replica; each replica gets its own durable name so
/// every replica sees every event (fan-out to in-memory projections, not a
/// work queue).
pub struct NatsEventConsumer {
    jetstream: jetstream::Context,
    consumer: jetstream::consumer::Consumer<pull::Config>,
}

impl NatsEventConsumer {
    pub async fn new(jetstream: &jetstream::Context, durable_name: &str) -> DomainResult<Self> {
        let stream = jetstream
            .get_stream(STREAM_NAME)
            .await
            .map_err(|err| DomainError::TransientIo(format!("nats stream lookup failed: {err}")))?;

        let consumer = stream
            .get_or_create_consumer(
                durable_name,
                pull::Config {
                    durable_name: Some(durable_name.to_string()),
                    filter_subject: SUBJECT_FILTER.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    max_deliver: MAX_DELIVER,
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| DomainError::TransientIo(format!("nats consumer setup failed: {err}")))?;

        Ok(Self { jetstream: jetstream.clone(), consumer })
    }

    /// Pull a batch and invoke `on_event` for each successfully-decoded
    /// envelope, awaiting it and acking the message only once it returns —
    /// so a crash between apply and ack redelivers rather than silently
    /// dropping the event, and two envelopes pulled together are applied in
    /// the order they were delivered rather than racing. A decode failure
    /// is logged and acked anyway, since a malformed message will never
    /// become parseable by redelivery. A message redelivered past
    /// `MAX_DELIVER` (bounded-redelivery, e.g. a handler that keeps failing
    /// to ack because of a transient outage) is republished to
    /// `DEAD_LETTER_SUBJECT` and terminated rather than retried forever.
    pub async fn run<F, Fut>(&self, mut on_event: F, shutdown: tokio_util::sync::CancellationToken)
    where
        F: FnMut(EventEnvelope) -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let batch = match self
                .consumer
                .batch()
                .max_messages(64)
                .expires(Duration::from_secs(5))
                .messages()
                .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    error!(error = %err, "failed to pull batch from nats consumer");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            tokio::pin!(batch);
            while let Some(message) = batch.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(error = %err, "error pulling message from nats");
                        continue;
                    }
                };

                let delivered = message.info().map(|info| info.delivered).unwrap_or(1);
                if delivered > MAX_DELIVER {
                    warn!(delivered, "redelivery limit exceeded, routing message to dead letter");
                    if let Err(err) = self.publish_dead_letter(&message.payload).await {
                        error!(error = %err, "failed to publish dead-lettered message");
                    }
                    if let Err(err) = message.ack_with(jetstream::AckKind::Term).await {
                        debug!(error = ?err, "failed to terminate redelivery for dead-lettered message");
                    }
                    continue;
                }

                match EventEnvelope::from_json(std::str::from_utf8(&message.payload).unwrap_or("")) {
                    Ok(envelope) => on_event(envelope).await,
                    Err(err) => warn!(error = %err, "dropping malformed event envelope"),
                }

                if let Err(err) = message.ack().await {
                    debug!(error = ?err, "failed to ack nats message");
                }
            }
        }
    }

    async fn publish_dead_letter(&self, payload: &[u8]) -> DomainResult<()> {
        let ack = self
            .jetstream
            .publish(DEAD_LETTER_SUBJECT, payload.to_vec().into())
            .await
            .map_err(|err| DomainError::TransientIo(format!("dead-letter publish failed: {err}")))?;

        ack.await
            .map_err(|err| DomainError::TransientIo(format!("dead-letter publish not acked: {err}")))?;

        Ok(())
    }
}
