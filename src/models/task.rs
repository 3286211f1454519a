use std::fmt;

/// Opaque identifier handed out by the backend when a task is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Only tasks that are still waiting on the backend can be cancelled.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }

    /// Forward-only state machine. Re-applying the current status is allowed
    /// for non-terminal states so repeated polls reporting `pending` are no-ops.
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        match (self, to) {
            (TaskStatus::Pending, TaskStatus::Pending) => true,
            (TaskStatus::Pending, TaskStatus::Processing) => true,
            (TaskStatus::Pending, TaskStatus::Success) => true,
            (TaskStatus::Pending, TaskStatus::Failed) => true,
            (TaskStatus::Pending, TaskStatus::Cancelled) => true,

            (TaskStatus::Processing, TaskStatus::Processing) => true,
            (TaskStatus::Processing, TaskStatus::Success) => true,
            (TaskStatus::Processing, TaskStatus::Failed) => true,
            (TaskStatus::Processing, TaskStatus::Cancelled) => true,

            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub filename: String,
    pub status: TaskStatus,
    /// Consecutive failed queries since creation or the last successful query.
    pub retries: u32,
}

impl Task {
    pub fn new(id: TaskId, filename: String) -> Self {
        Self {
            id,
            filename,
            status: TaskStatus::Pending,
            retries: 0,
        }
    }
}
