pub mod draft;
pub mod draft_pick;
pub mod outbox;
pub mod player_pool;

pub use draft::{DraftRepository, DueDraft};
pub use draft_pick::DraftPickRepository;
pub use outbox::OutboxRepository;
pub use player_pool::AvailablePlayerPool;
