use thiserror::Error;

use crate::persistent::errors::StorageError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Storage(#[from] StorageError),
}

impl DbError {
    /// Whether this error was caused by an attempt to overwrite a write-once field or to create
    /// an entity that already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Storage(StorageError::Conflict(_)))
    }
}

pub type DbResult<T> = Result<T, DbError>;
