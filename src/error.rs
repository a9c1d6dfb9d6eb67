//! Error types for joblock.
//!
//! Uses thiserror for derive macros. Every variant maps to an exit code so the
//! binary can tell a supervisor whether to keep the worker running or restart it.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for joblock operations.
#[derive(Error, Debug)]
pub enum JobLockError {
    /// User provided invalid arguments, configuration, or the root is not initialized.
    #[error("{0}")]
    UserError(String),

    /// A query, update, or persistence step against the job store failed.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// Index provisioning failed.
    #[error("Index provisioning failed: {0}")]
    IndexError(String),

    /// A store call exceeded the configured claim timeout.
    #[error("Store call timed out: {0}")]
    Timeout(String),

    /// Connectivity to the store is gone and cannot come back without a restart.
    #[error("Store connection is not recoverable, restart required: {0}")]
    ConnectionLost(String),

    /// The store's table lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

impl JobLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobLockError::UserError(_) => exit_codes::USER_ERROR,
            JobLockError::StoreError(_) => exit_codes::STORE_FAILURE,
            JobLockError::IndexError(_) => exit_codes::STORE_FAILURE,
            JobLockError::Timeout(_) => exit_codes::STORE_FAILURE,
            JobLockError::ConnectionLost(_) => exit_codes::CONNECTION_LOST,
            JobLockError::LockError(_) => exit_codes::LOCK_FAILURE,
        }
    }

    /// Whether the owning process must stop polling and exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, JobLockError::ConnectionLost(_))
    }
}

/// Result type alias for joblock operations.
pub type Result<T> = std::result::Result<T, JobLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = JobLockError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn store_side_errors_share_exit_code() {
        for err in [
            JobLockError::StoreError("update failed".to_string()),
            JobLockError::IndexError("conflict".to_string()),
            JobLockError::Timeout("find".to_string()),
        ] {
            assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
        }
    }

    #[test]
    fn connection_lost_is_the_only_fatal_error() {
        let fatal = JobLockError::ConnectionLost("topology destroyed".to_string());
        assert!(fatal.is_fatal());
        assert_eq!(fatal.exit_code(), exit_codes::CONNECTION_LOST);

        assert!(!JobLockError::StoreError("x".to_string()).is_fatal());
        assert!(!JobLockError::Timeout("x".to_string()).is_fatal());
        assert!(!JobLockError::LockError("x".to_string()).is_fatal());
    }

    #[test]
    fn lock_error_has_correct_exit_code() {
        let err = JobLockError::LockError("table locked".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err =
            JobLockError::IndexError("findAndLockIndex exists with different keys".to_string());
        assert_eq!(
            err.to_string(),
            "Index provisioning failed: findAndLockIndex exists with different keys"
        );

        let err = JobLockError::ConnectionLost("auto_reconnect disabled".to_string());
        assert!(err.to_string().contains("restart required"));
    }
}
