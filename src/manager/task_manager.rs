use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use crossbeam_channel::{bounded, unbounded, Sender};
use log::{error, info};

use crate::backend::{SimulatedBackend, TaskBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::manager::tracker::UploadTracker;
use crate::models::message::TaskMessage;
use crate::models::task::{Task, TaskId, TaskStatus};
use crate::worker::driver::PollConfig;
use crate::worker::worker::spawn_worker_thread;

/// Thread-safe handle to a tracker running on its own control thread.
pub struct TaskManager {
    sender: Sender<TaskMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskManager {
    /// Starts a manager backed by the in-memory simulated service.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backend = SimulatedBackend::new(config.policy(), clock.clone());
        Ok(Self::start(backend, config.poll_config(), clock))
    }

    pub fn start<B>(backend: B, poll: PollConfig, clock: Arc<dyn Clock>) -> Self
    where
        B: TaskBackend + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let tracker = UploadTracker::new(backend, poll, clock);
        let worker = spawn_worker_thread(receiver, tracker);
        info!("Task manager started.");
        Self {
            sender,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn create_task(&self, filename: impl Into<String>) -> Result<TaskId> {
        let (reply, response) = bounded(1);
        self.send(TaskMessage::Submit(filename.into(), reply))?;
        response.recv().map_err(|_| TrackerError::Disconnected)?
    }

    pub fn cancel_task(&self, id: &TaskId) -> Result<bool> {
        let (reply, response) = bounded(1);
        self.send(TaskMessage::Cancel(id.clone(), reply))?;
        response.recv().map_err(|_| TrackerError::Disconnected)
    }

    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        let (reply, response) = bounded(1);
        self.send(TaskMessage::Get(id.clone(), reply)).ok()?;
        response.recv().ok().flatten()
    }

    pub fn get_task_status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.get_task(id).map(|task| task.status)
    }

    pub fn get_all_tasks(&self) -> Vec<Task> {
        let (reply, response) = bounded(1);
        if self.send(TaskMessage::List(reply)).is_err() {
            return vec![];
        }
        response.recv().unwrap_or_default()
    }

    /// Stops every polling loop and joins the control thread.
    pub fn shutdown(&self) {
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };
        let _ = self.sender.send(TaskMessage::Shutdown);
        if worker.join().is_err() {
            error!("Worker thread panicked.");
        }
        info!("Task manager stopped.");
    }

    fn send(&self, message: TaskMessage) -> Result<()> {
        self.sender.send(message).map_err(|e| {
            error!("Failed to send message: {}", e);
            TrackerError::Disconnected
        })
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
