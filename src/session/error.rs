use thiserror::Error;

use crate::storage::error::StorageError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation doesn't apply to the current state. Nothing was changed.
    #[error("can't {operation} while {state}")]
    PreconditionViolation {
        operation: &'static str,
        state: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, SessionError::PreconditionViolation { .. })
    }
}
