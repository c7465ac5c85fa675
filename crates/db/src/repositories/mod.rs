pub mod commit_protocol;
pub mod draft;
pub mod draft_pick;
pub mod outbox;
pub mod player_pool;

pub use commit_protocol::SqlxCommitProtocol;
pub use draft::SqlxDraftRepository;
pub use draft_pick::SqlxDraftPickRepository;
pub use outbox::SqlxOutboxRepository;
pub use player_pool::SqlxAvailablePlayerPool;
