use std::sync::Arc;
use std::time::Instant;

use log::{error, info};

use crate::backend::TaskBackend;
use crate::clock::Clock;
use crate::error::{Result, TrackerError};
use crate::models::task::{Task, TaskId, TaskStatus};
use crate::models::task_list::TaskList;
use crate::worker::driver::{PollConfig, PollingDriver};

/// Owns the task list, the backend and the polling driver.
///
/// All state lives on whichever thread owns the tracker; nothing here is
/// shared, so callbacks are serialized simply by being method calls.
pub struct UploadTracker<B: TaskBackend> {
    tasks: TaskList,
    backend: B,
    driver: PollingDriver,
    clock: Arc<dyn Clock>,
}

impl<B: TaskBackend> UploadTracker<B> {
    pub fn new(backend: B, config: PollConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: TaskList::new(),
            backend,
            driver: PollingDriver::new(config),
            clock,
        }
    }

    /// Creates the task on the backend, records it as pending and starts
    /// polling. Nothing is recorded if the backend refuses the task.
    pub fn submit(&mut self, filename: impl Into<String>) -> Result<TaskId> {
        let filename = filename.into();
        let id = self.backend.create().map_err(|e| {
            error!("Failed to start upload of '{}': {}", filename, e);
            TrackerError::StartFailed(e)
        })?;

        self.tasks.insert(Task::new(id.clone(), filename.clone()))?;
        self.driver.start_polling(id.clone(), self.clock.now());
        info!("Task '{}' created for '{}'.", id, filename);
        Ok(id)
    }

    /// User-initiated cancel. Returns `false` if the task is unknown or has
    /// already finished, in which case nothing changes.
    pub fn cancel(&mut self, id: &TaskId) -> bool {
        let cancelable = self
            .tasks
            .get(id)
            .is_some_and(|task| task.status.is_cancelable());
        if !cancelable {
            self.driver.cancel_polling(id);
            return false;
        }

        self.backend.cancel(id);
        self.driver.cancel_polling(id);
        match self.tasks.set_status(id, TaskStatus::Cancelled) {
            Ok(changed) => {
                info!("Task '{}' cancelled.", id);
                changed
            }
            Err(_) => false,
        }
    }

    /// Runs every polling timer that is due. Returns how many fired.
    pub fn advance(&mut self) -> usize {
        let now = self.clock.now();
        self.driver.run_due(now, &mut self.tasks, &mut self.backend)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.driver.next_deadline()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.snapshot(id)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.to_vec()
    }

    pub fn task_list(&self) -> &TaskList {
        &self.tasks
    }

    pub fn driver(&self) -> &PollingDriver {
        &self.driver
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn shutdown(&mut self) {
        self.driver.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{ScriptedPolicy, SimulatedBackend};
    use crate::clock::ManualClock;
    use crate::error::{BackendError, QueryError};
    use crate::backend::BackendStatus;

    fn tracker(policy: ScriptedPolicy) -> (UploadTracker<SimulatedBackend>, ManualClock) {
        let clock = ManualClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let backend = SimulatedBackend::new(policy, shared.clone());
        (UploadTracker::new(backend, PollConfig::default(), shared), clock)
    }

    struct OfflineBackend;

    impl TaskBackend for OfflineBackend {
        fn create(&mut self) -> std::result::Result<TaskId, BackendError> {
            Err(BackendError::Unavailable("offline".into()))
        }

        fn query_status(&mut self, id: &TaskId) -> std::result::Result<BackendStatus, QueryError> {
            Err(QueryError::NotFound(id.clone()))
        }

        fn cancel(&mut self, _id: &TaskId) {}
    }

    #[test]
    fn submit_records_pending_task() {
        let (mut tracker, _) = tracker(ScriptedPolicy::new(Duration::from_secs(5)));
        let id = tracker.submit("report.pdf").unwrap();

        let task = tracker.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.filename, "report.pdf");
        assert!(tracker.driver().is_polling(&id));
    }

    #[test]
    fn creation_failure_adds_nothing() {
        let mut tracker = UploadTracker::new(
            OfflineBackend,
            PollConfig::default(),
            Arc::new(ManualClock::new()),
        );
        let err = tracker.submit("report.pdf").unwrap_err();
        assert!(matches!(err, TrackerError::StartFailed(_)));
        assert!(tracker.tasks().is_empty());
        assert_eq!(tracker.next_deadline(), None);
    }

    #[test]
    fn cancel_marks_task_and_backend() {
        let (mut tracker, _) = tracker(ScriptedPolicy::new(Duration::from_secs(5)));
        let id = tracker.submit("report.pdf").unwrap();

        assert!(tracker.cancel(&id));
        assert_eq!(tracker.task(&id).unwrap().status, TaskStatus::Cancelled);
        assert_eq!(tracker.backend_mut().status(&id), Some(BackendStatus::Failed));
        assert!(!tracker.driver().is_polling(&id));
    }

    #[test]
    fn cancel_of_finished_task_changes_nothing() {
        let (mut tracker, clock) = tracker(ScriptedPolicy::new(Duration::ZERO));
        let id = tracker.submit("report.pdf").unwrap();

        clock.advance(Duration::from_secs(3));
        tracker.advance();
        assert_eq!(tracker.task(&id).unwrap().status, TaskStatus::Success);

        assert!(!tracker.cancel(&id));
        assert!(!tracker.cancel(&TaskId::from("task_unknown")));
        assert_eq!(tracker.task(&id).unwrap().status, TaskStatus::Success);
    }

    #[test]
    fn tasks_keep_submission_order() {
        let (mut tracker, _) = tracker(ScriptedPolicy::new(Duration::from_secs(5)));
        tracker.submit("a.png").unwrap();
        tracker.submit("b.png").unwrap();
        let names: Vec<_> = tracker.tasks().into_iter().map(|t| t.filename).collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }
}
