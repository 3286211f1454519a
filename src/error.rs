use thiserror::Error;

use crate::models::task::{TaskId, TaskStatus};

/// Failures reported by `TaskBackend::query_status`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("network error")]
    TransientNetwork,

    /// The task itself finished unsuccessfully. This is an outcome, not a fault.
    #[error("task failed")]
    TaskFailed,
}

impl QueryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::NotFound(_) | QueryError::TransientNetwork)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to start upload: {0}")]
    StartFailed(#[from] BackendError),

    #[error("task {0} is already tracked")]
    DuplicateTask(TaskId),

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("{0}")]
    Validation(String),

    #[error("tracker thread is no longer running")]
    Disconnected,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
