//! The Outbox Relay (§4.4): polls the durable outbox in per-draft commit
//! order and publishes each row at-least-once to the message bus. Embedded
//! in the Orchestrator binary as a background task alongside the Scheduler
//! Loop, grounded in the same poll-sleep-repeat shape.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::DomainResult;
use crate::events::EventEnvelope;
use crate::repositories::OutboxRepository;

/// Narrow contract onto the message bus so `domain` never depends on
/// `async-nats` directly; `bus::NatsEventPublisher` is the one real impl.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> DomainResult<()>;
}

const POLL_INTERVAL: StdDuration = StdDuration::from_millis(500);
const MAX_BACKOFF: StdDuration = StdDuration::from_secs(30);

pub struct OutboxRelayConfig {
    pub batch_size: i64,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

pub struct OutboxRelay {
    outbox: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn BusPublisher>,
    config: OutboxRelayConfig,
}

impl OutboxRelay {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        publisher: Arc<dyn BusPublisher>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            outbox,
            publisher,
            config,
        }
    }

    /// Run until `shutdown` is cancelled. On a publish failure the relay
    /// backs off with capped exponential delay and retries the same batch;
    /// rows are only marked sent after a successful publish, so a crash
    /// between the two steps just redelivers (at-least-once, never fewer).
    pub async fn run(self, shutdown: CancellationToken) {
        let mut backoff = POLL_INTERVAL;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.relay_once().await {
                Ok(sent) => {
                    backoff = POLL_INTERVAL;
                    if sent > 0 {
                        debug!(sent, "outbox relay published batch");
                    }
                }
                Err(err) => {
                    warn!(error = %err, backoff_ms = backoff.as_millis(), "outbox relay batch failed, backing off");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }

        info!("outbox relay shutting down");
    }

    async fn relay_once(&self) -> DomainResult<usize> {
        let rows = self.outbox.fetch_unsent(self.config.batch_size).await?;
        let count = rows.len();

        for row in rows {
            let id = row.id;
            let envelope = row.into_envelope();
            self.publisher.publish(&envelope).await?;
            self.outbox.mark_sent(id).await?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DomainError;
    use crate::events::{payload, EventKind, OutboxRow};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingOutbox {
        unsent: Mutex<Vec<OutboxRow>>,
        sent: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl OutboxRepository for RecordingOutbox {
        async fn fetch_unsent(&self, limit: i64) -> DomainResult<Vec<OutboxRow>> {
            let mut unsent = self.unsent.lock().unwrap();
            let take = (limit as usize).min(unsent.len());
            Ok(unsent.drain(..take).collect())
        }

        async fn mark_sent(&self, id: Uuid) -> DomainResult<()> {
            self.sent.lock().unwrap().push(id);
            Ok(())
        }
    }

    struct RecordingPublisher {
        published: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl BusPublisher for RecordingPublisher {
        async fn publish(&self, envelope: &EventEnvelope) -> DomainResult<()> {
            self.published.lock().unwrap().push(envelope.id);
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl BusPublisher for FailingPublisher {
        async fn publish(&self, _envelope: &EventEnvelope) -> DomainResult<()> {
            Err(DomainError::TransientIo("bus unreachable".into()))
        }
    }

    fn sample_row() -> OutboxRow {
        OutboxRow::new(
            Uuid::new_v4(),
            EventKind::DraftStarted,
            payload::draft_lifecycle(Uuid::new_v4()),
        )
    }

    #[tokio::test]
    async fn relay_once_publishes_and_marks_sent() {
        let row = sample_row();
        let row_id = row.id;
        let outbox = Arc::new(RecordingOutbox {
            unsent: Mutex::new(vec![row]),
            sent: Mutex::new(vec![]),
        });
        let publisher = Arc::new(RecordingPublisher {
            published: Mutex::new(vec![]),
        });
        let relay = OutboxRelay::new(outbox.clone(), publisher.clone(), OutboxRelayConfig::default());

        let sent = relay.relay_once().await.unwrap();
        assert_eq!(sent, 1);
        assert_eq!(publisher.published.lock().unwrap().as_slice(), &[row_id]);
        assert_eq!(outbox.sent.lock().unwrap().as_slice(), &[row_id]);
    }

    #[tokio::test]
    async fn relay_once_leaves_row_unmarked_when_publish_fails() {
        let row = sample_row();
        let outbox = Arc::new(RecordingOutbox {
            unsent: Mutex::new(vec![row]),
            sent: Mutex::new(vec![]),
        });
        let relay = OutboxRelay::new(outbox.clone(), Arc::new(FailingPublisher), OutboxRelayConfig::default());

        let result = relay.relay_once().await;
        assert!(result.is_err());
        assert!(outbox.sent.lock().unwrap().is_empty());
    }
}
