use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Already picked: {0}")]
    AlreadyPicked(String),

    #[error("Draft not in progress: {0}")]
    DraftNotInProgress(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Transient I/O error: {0}")]
    TransientIo(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
