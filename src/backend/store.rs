use std::collections::HashMap;

use crate::models::task::TaskId;
use crate::timer::TimerId;

use super::BackendStatus;

#[derive(Debug, Clone)]
pub struct BackendRecord {
    pub id: TaskId,
    pub status: BackendStatus,
    /// Completion timer; `None` once the record is final.
    pub completion: Option<TimerId>,
    pub pickup: Option<TimerId>,
}

impl BackendRecord {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: BackendStatus::Pending,
            completion: None,
            pickup: None,
        }
    }
}

/// Authoritative backend-side state, keyed by task id.
#[derive(Debug, Default)]
pub struct TaskStore {
    records: HashMap<TaskId, BackendRecord>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: BackendRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &TaskId) -> Option<&BackendRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut BackendRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
