//! Task backend: the three-operation contract the polling driver talks to,
//! and an in-memory simulation of it.

pub mod policy;
pub mod simulated;
pub mod store;

use crate::error::{BackendError, QueryError};
use crate::models::task::{TaskId, TaskStatus};

pub use policy::{OutcomePolicy, RandomPolicy, ScriptedPolicy};
pub use simulated::SimulatedBackend;
pub use store::{BackendRecord, TaskStore};

/// Status as the backend sees it. There is no `Cancelled`: cancellation is a
/// caller-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl From<BackendStatus> for TaskStatus {
    fn from(status: BackendStatus) -> Self {
        match status {
            BackendStatus::Pending => TaskStatus::Pending,
            BackendStatus::Processing => TaskStatus::Processing,
            BackendStatus::Success => TaskStatus::Success,
            BackendStatus::Failed => TaskStatus::Failed,
        }
    }
}

/// A remote service that runs submitted work.
///
/// `query_status` reports a failed task as `Err(QueryError::TaskFailed)` rather
/// than `Ok(BackendStatus::Failed)`; callers must accept both.
pub trait TaskBackend {
    fn create(&mut self) -> Result<TaskId, BackendError>;

    fn query_status(&mut self, id: &TaskId) -> Result<BackendStatus, QueryError>;

    /// Best effort and idempotent. Unknown or finished tasks are ignored.
    fn cancel(&mut self, id: &TaskId);
}

impl<B: TaskBackend + ?Sized> TaskBackend for Box<B> {
    fn create(&mut self) -> Result<TaskId, BackendError> {
        (**self).create()
    }

    fn query_status(&mut self, id: &TaskId) -> Result<BackendStatus, QueryError> {
        (**self).query_status(id)
    }

    fn cancel(&mut self, id: &TaskId) {
        (**self).cancel(id)
    }
}
