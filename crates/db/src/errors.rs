use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Mapping error: {0}")]
    MappingError(String),

    /// Raised when a commit transaction's `UPDATE ... RETURNING` affects
    /// zero rows: the slot was already claimed by a concurrent commit.
    #[error("Slot already claimed: {0}")]
    AlreadyPicked(String),

    #[error("Draft not in progress: {0}")]
    DraftNotInProgress(String),
}

pub type DbResult<T> = Result<T, DbError>;

// Convert DbError to DomainError
impl From<DbError> for domain::errors::DomainError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => domain::errors::DomainError::NotFound(msg),
            DbError::DuplicateEntry(msg) => domain::errors::DomainError::ConstraintViolation(msg),
            DbError::AlreadyPicked(msg) => domain::errors::DomainError::AlreadyPicked(msg),
            DbError::DraftNotInProgress(msg) => {
                domain::errors::DomainError::DraftNotInProgress(msg)
            }
            DbError::DatabaseError(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
                domain::errors::DomainError::ConstraintViolation(format!("unique constraint violated: {}", e))
            }
            DbError::DatabaseError(e) => {
                domain::errors::DomainError::DatabaseError(format!("Database error: {}", e))
            }
            DbError::MappingError(msg) => {
                domain::errors::DomainError::InternalError(format!("Mapping error: {}", msg))
            }
        }
    }
}
