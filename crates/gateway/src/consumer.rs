//! Bus consumer loop (§4.6): pulls `draft.events.>` off the durable
//! `DRAFT_EVENTS` stream and fans each envelope out to the projection store
//! and the subscription manager. Runs as a single task for the whole
//! process; `bus::NatsEventConsumer::run` handles pull/ack.

use tokio_util::sync::CancellationToken;

use domain::events::EventEnvelope;

use crate::projection::ProjectionStore;
use crate::subscription::SubscriptionManager;

pub struct EventConsumer {
    nats_consumer: bus::NatsEventConsumer,
    projections: ProjectionStore,
    subscriptions: SubscriptionManager,
}

impl EventConsumer {
    pub fn new(
        nats_consumer: bus::NatsEventConsumer,
        projections: ProjectionStore,
        subscriptions: SubscriptionManager,
    ) -> Self {
        Self {
            nats_consumer,
            projections,
            subscriptions,
        }
    }

    /// Run until `shutdown` is cancelled. Each envelope is applied to the
    /// projection and broadcast to subscribers synchronously before the
    /// message is acked by `NatsEventConsumer::run`, so acked messages are
    /// never silently dropped on the floor between the two steps. Awaiting
    /// `on_event` inline (rather than spawning it) also keeps envelopes for
    /// the same draft in the per-subject FIFO order they were pulled in —
    /// spawning would let two envelopes from the same batch race to apply
    /// out of order.
    pub async fn run(self, shutdown: CancellationToken) {
        let projections = self.projections.clone();
        let subscriptions = self.subscriptions.clone();

        let on_event = move |envelope: EventEnvelope| {
            let projections = projections.clone();
            let subscriptions = subscriptions.clone();
            async move {
                projections.apply(&envelope).await;
                subscriptions.broadcast(&envelope).await;
            }
        };

        self.nats_consumer.run(on_event, shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    // `EventConsumer::run` requires a live NATS connection to construct a
    // `bus::NatsEventConsumer`; the apply/broadcast composition it wires
    // together is covered directly by `projection`'s and `subscription`'s
    // own unit tests.
}
