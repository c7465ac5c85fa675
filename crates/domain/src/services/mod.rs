pub mod auto_pick;
pub mod outbox_relay;
pub mod scheduler;

pub use auto_pick::{
    AutoPickStrategy, BestPlayerAvailableAutoPick, CommitRequest, PlayerRankingProvider,
    UniformRandomAutoPick,
};
pub use outbox_relay::{BusPublisher, OutboxRelay, OutboxRelayConfig};
pub use scheduler::{SchedulerConfig, SchedulerLoop, SchedulerWake};
