pub mod draft;
pub mod outbox;

pub use draft::{DraftDb, DraftPickDb};
pub use outbox::OutboxDb;
