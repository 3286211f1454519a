use std::collections::HashMap;

use log::{info, warn};

use crate::error::{Result, TrackerError};
use crate::models::task::{Task, TaskId, TaskStatus};

/// Tasks in submission order, indexed by id.
///
/// Every status change goes through [`TaskList::set_status`], which enforces the
/// forward-only state machine, so a late asynchronous callback can never pull
/// a task back out of a terminal state.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.id) {
            return Err(TrackerError::DuplicateTask(task.id));
        }
        self.index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    /// Current state of a task, by value.
    pub fn snapshot(&self, id: &TaskId) -> Option<Task> {
        self.get(id).cloned()
    }

    /// Returns `Ok(true)` when the status actually changed.
    pub fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> Result<bool> {
        let Some(task) = self.get_mut(id) else {
            return Ok(false);
        };
        if !task.status.can_transition_to(status) {
            warn!("Rejected transition for task '{}': {} -> {}", id, task.status, status);
            return Err(TrackerError::InvalidTransition {
                id: id.clone(),
                from: task.status,
                to: status,
            });
        }
        if task.status == status {
            return Ok(false);
        }
        task.status = status;
        info!("Task status updated {}: {}", id, status);
        Ok(true)
    }

    /// Ignored once the task is terminal; the counter no longer means anything.
    pub fn set_retries(&mut self, id: &TaskId, retries: u32) -> bool {
        match self.get_mut(id) {
            Some(task) if !task.status.is_terminal() => {
                task.retries = retries;
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        match self.index.get(id) {
            Some(&i) => self.tasks.get_mut(i),
            None => None,
        }
    }
}
