//! Error types for the facilitator.

use facilitator_db::errors::DbError;
use thiserror::Error;

/// Unified error type for everything that can go wrong while handling a batch.
///
/// None of these are fatal to the process: they are scoped to the batch being handled, which can
/// be resubmitted as a whole.
#[derive(Debug, Error)]
pub enum FacilitatorError {
    /// The batch contains a kind that no handler is registered for.
    #[error("no handler registered for kind {0}")]
    HandlerNotFound(String),

    /// A raw record could not be decoded into the model of its kind.
    #[error("invalid {kind} record: {source}")]
    InvalidRecord {
        /// The kind of the record.
        kind: String,

        /// The decoding error.
        source: serde_json::Error,
    },

    /// Errors from the repositories.
    #[error("persistence failed: {0}")]
    Persistence(#[from] DbError),

    /// Stored or computed data contradicts the message protocol.
    #[error("protocol invariant violated: {0}")]
    ProtocolInvariantViolation(String),
}

impl FacilitatorError {
    /// Reports a write-once conflict in storage as a protocol invariant violation described by
    /// `context`. Any other error is passed through as a persistence failure.
    pub(crate) fn on_conflict(err: DbError, context: impl FnOnce() -> String) -> Self {
        if err.is_conflict() {
            Self::ProtocolInvariantViolation(format!("{}: {err}", context()))
        } else {
            err.into()
        }
    }
}

/// Result alias for [`FacilitatorError`].
pub type FacilitatorResult<T> = Result<T, FacilitatorError>;

#[cfg(test)]
mod tests {
    use facilitator_db::persistent::errors::StorageError;

    use super::*;

    #[test]
    fn test_conflicts_become_invariant_violations() {
        let conflict = DbError::Storage(StorageError::Conflict("message exists".to_string()));
        assert!(
            matches!(
                FacilitatorError::on_conflict(conflict, || "accepting".to_string()),
                FacilitatorError::ProtocolInvariantViolation(msg) if msg.starts_with("accepting: ")
            ),
            "storage conflicts must surface as invariant violations"
        );

        let invalid = DbError::Storage(StorageError::InvalidData("bad row".to_string()));
        assert!(
            matches!(
                FacilitatorError::on_conflict(invalid, || "accepting".to_string()),
                FacilitatorError::Persistence(_)
            ),
            "other storage errors must stay persistence failures"
        );
    }
}
