use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::clock::Clock;
use crate::error::{BackendError, QueryError};
use crate::models::task::TaskId;
use crate::timer::TimerQueue;

use super::policy::OutcomePolicy;
use super::store::{BackendRecord, TaskStore};
use super::{BackendStatus, TaskBackend};

#[derive(Debug, Clone)]
enum BackendEvent {
    Pickup(TaskId),
    Complete(TaskId),
}

/// In-process stand-in for a remote processing service.
///
/// Each created task gets a one-shot completion timer that settles it to
/// `success` or `failed`. Timers are evaluated lazily against the clock at the
/// start of every operation, so the backend needs no thread of its own.
pub struct SimulatedBackend {
    store: TaskStore,
    timers: TimerQueue<BackendEvent>,
    policy: Box<dyn OutcomePolicy>,
    clock: Arc<dyn Clock>,
    next_seq: u64,
}

impl SimulatedBackend {
    pub fn new(policy: impl OutcomePolicy + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TaskStore::new(),
            timers: TimerQueue::new(),
            policy: Box::new(policy),
            clock,
            next_seq: 0,
        }
    }

    /// Backend-side status after applying every event due by now.
    pub fn status(&mut self, id: &TaskId) -> Option<BackendStatus> {
        self.settle();
        self.store.get(id).map(|r| r.status)
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn settle(&mut self) {
        let now = self.clock.now();
        while let Some((_, event)) = self.timers.pop_due(now) {
            match event {
                BackendEvent::Pickup(id) => {
                    if let Some(record) = self.store.get_mut(&id) {
                        record.pickup = None;
                        if record.status == BackendStatus::Pending {
                            record.status = BackendStatus::Processing;
                            debug!("Backend picked up task '{}'.", id);
                        }
                    }
                }
                BackendEvent::Complete(id) => {
                    let failed = self.policy.completion_fails();
                    if let Some(record) = self.store.get_mut(&id) {
                        record.completion = None;
                        if let Some(pickup) = record.pickup.take() {
                            self.timers.cancel(pickup);
                        }
                        record.status = if failed {
                            BackendStatus::Failed
                        } else {
                            BackendStatus::Success
                        };
                        debug!("Backend finished task '{}': {:?}", id, record.status);
                    }
                }
            }
        }
    }

    fn generate_id(&mut self) -> TaskId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.next_seq += 1;
        TaskId::new(format!("task_{}_{}", millis, self.next_seq))
    }
}

impl TaskBackend for SimulatedBackend {
    fn create(&mut self) -> Result<TaskId, BackendError> {
        self.settle();
        let now = self.clock.now();
        let id = self.generate_id();
        let mut record = BackendRecord::new(id.clone());

        if let Some(delay) = self.policy.pickup_delay() {
            record.pickup = Some(
                self.timers
                    .schedule_once(now + delay, BackendEvent::Pickup(id.clone())),
            );
        }
        let delay = self.policy.completion_delay();
        record.completion = Some(
            self.timers
                .schedule_once(now + delay, BackendEvent::Complete(id.clone())),
        );
        self.store.insert(record);

        info!("Backend accepted task '{}' (completes in {:?}).", id, delay);
        Ok(id)
    }

    fn query_status(&mut self, id: &TaskId) -> Result<BackendStatus, QueryError> {
        self.settle();
        let Some(record) = self.store.get(id) else {
            return Err(QueryError::NotFound(id.clone()));
        };
        let status = record.status;
        if self.policy.transient_fault() {
            return Err(QueryError::TransientNetwork);
        }
        match status {
            BackendStatus::Failed => Err(QueryError::TaskFailed),
            status => Ok(status),
        }
    }

    fn cancel(&mut self, id: &TaskId) {
        self.settle();
        let Some(record) = self.store.get_mut(id) else {
            return;
        };
        let Some(completion) = record.completion.take() else {
            return;
        };
        self.timers.cancel(completion);
        if let Some(pickup) = record.pickup.take() {
            self.timers.cancel(pickup);
        }
        record.status = BackendStatus::Failed;
        info!("Backend cancelled task '{}'.", id);
    }
}
