//! Per-task polling loop.
//!
//! Every polled task owns one repeating tick timer and at most one pending
//! retry. Query results are not applied where they are issued; they come back
//! as a separate settle event, the way a response to a real network call
//! would. Each tick, retry and settle re-reads the task from the
//! [`TaskList`] and checks that its loop is still the one that issued the
//! event before touching anything, so a late retry or response can never
//! overwrite a cancellation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::backend::{BackendStatus, TaskBackend};
use crate::error::QueryError;
use crate::models::task::{Task, TaskId, TaskStatus};
use crate::models::task_list::TaskList;
use crate::timer::{TimerId, TimerQueue};

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub retry_delay: Duration,
    /// Consecutive failed queries after which a task is marked failed.
    pub max_retries: u32,
    /// Time between issuing a query and its result being applied.
    pub query_latency: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            retry_delay: Duration::from_millis(2000),
            max_retries: 3,
            query_latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
enum PollEvent {
    Tick {
        id: TaskId,
        generation: u64,
    },
    Retry {
        id: TaskId,
        generation: u64,
        attempt: u32,
    },
    Settle {
        id: TaskId,
        generation: u64,
        attempt: u32,
        outcome: Result<BackendStatus, QueryError>,
    },
}

#[derive(Debug)]
struct PollHandles {
    generation: u64,
    interval: TimerId,
    retry: Option<TimerId>,
    in_flight: bool,
}

pub struct PollingDriver {
    config: PollConfig,
    timers: TimerQueue<PollEvent>,
    active: HashMap<TaskId, PollHandles>,
    next_generation: u64,
    queries: u64,
}

impl PollingDriver {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            timers: TimerQueue::new(),
            active: HashMap::new(),
            next_generation: 0,
            queries: 0,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Starts the repeating query loop; the first tick fires one interval
    /// from `now`. A second call for a task that is already polled keeps the
    /// existing loop.
    pub fn start_polling(&mut self, id: TaskId, now: Instant) {
        if self.active.contains_key(&id) {
            warn!("Task '{}' is already being polled.", id);
            return;
        }
        let generation = self.next_generation;
        self.next_generation += 1;

        let interval = self.timers.schedule_repeating(
            now + self.config.interval,
            self.config.interval,
            PollEvent::Tick {
                id: id.clone(),
                generation,
            },
        );
        debug!("Polling task '{}' every {:?}.", id, self.config.interval);
        self.active.insert(
            id,
            PollHandles {
                generation,
                interval,
                retry: None,
                in_flight: false,
            },
        );
    }

    /// Stops the loop and any pending retry. Safe to call repeatedly.
    pub fn cancel_polling(&mut self, id: &TaskId) -> bool {
        let Some(handles) = self.active.remove(id) else {
            return false;
        };
        self.timers.cancel(handles.interval);
        if let Some(retry) = handles.retry {
            self.timers.cancel(retry);
        }
        debug!("Stopped polling task '{}'.", id);
        true
    }

    /// Stops every loop and drops every timer, including unsettled responses.
    pub fn shutdown(&mut self) {
        if !self.active.is_empty() {
            info!("Stopping {} polling loop(s).", self.active.len());
        }
        self.active.clear();
        self.timers.clear();
    }

    pub fn is_polling(&self, id: &TaskId) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Total status queries issued since creation.
    pub fn queries_issued(&self) -> u64 {
        self.queries
    }

    /// Fires every timer due at `now` and returns how many fired.
    pub fn run_due<B>(&mut self, now: Instant, tasks: &mut TaskList, backend: &mut B) -> usize
    where
        B: TaskBackend + ?Sized,
    {
        let mut fired = 0;
        while let Some((_, event)) = self.timers.pop_due(now) {
            fired += 1;
            match event {
                PollEvent::Tick { id, generation } => {
                    self.on_tick(&id, generation, now, tasks, backend);
                }
                PollEvent::Retry {
                    id,
                    generation,
                    attempt,
                } => {
                    self.on_retry(&id, generation, attempt, now, tasks, backend);
                }
                PollEvent::Settle {
                    id,
                    generation,
                    attempt,
                    outcome,
                } => {
                    self.on_settle(&id, generation, attempt, outcome, now, tasks);
                }
            }
        }
        fired
    }

    fn on_tick<B>(
        &mut self,
        id: &TaskId,
        generation: u64,
        now: Instant,
        tasks: &TaskList,
        backend: &mut B,
    ) where
        B: TaskBackend + ?Sized,
    {
        let Some(task) = self.live_task(id, generation, tasks) else {
            return;
        };
        let busy = self
            .active
            .get(id)
            .is_some_and(|h| h.retry.is_some() || h.in_flight);
        if busy {
            debug!("Tick for task '{}' skipped, a query or retry is outstanding.", id);
            return;
        }
        self.issue_query(id, generation, task.retries, now, backend);
    }

    fn on_retry<B>(
        &mut self,
        id: &TaskId,
        generation: u64,
        attempt: u32,
        now: Instant,
        tasks: &TaskList,
        backend: &mut B,
    ) where
        B: TaskBackend + ?Sized,
    {
        if self.live_task(id, generation, tasks).is_none() {
            return;
        }
        if let Some(handles) = self.active.get_mut(id) {
            handles.retry = None;
        }
        debug!("Retrying status query for task '{}' (attempt {}).", id, attempt);
        self.issue_query(id, generation, attempt, now, backend);
    }

    fn on_settle(
        &mut self,
        id: &TaskId,
        generation: u64,
        attempt: u32,
        outcome: Result<BackendStatus, QueryError>,
        now: Instant,
        tasks: &mut TaskList,
    ) {
        if let Some(handles) = self.active.get_mut(id) {
            if handles.generation == generation {
                handles.in_flight = false;
            }
        }
        if self.live_task(id, generation, tasks).is_none() {
            debug!("Discarded late query result for task '{}'.", id);
            return;
        }

        match outcome {
            Err(QueryError::TaskFailed) | Ok(BackendStatus::Failed) => {
                info!("Task '{}' failed during processing.", id);
                self.finish(id, TaskStatus::Failed, tasks);
            }
            Ok(status) => {
                tasks.set_retries(id, 0);
                let status = TaskStatus::from(status);
                if status.is_terminal() {
                    self.finish(id, status, tasks);
                } else if let Err(e) = tasks.set_status(id, status) {
                    warn!("Ignoring status report for task '{}': {}", id, e);
                }
            }
            Err(err) => {
                let retries = attempt + 1;
                tasks.set_retries(id, retries);
                if retries >= self.config.max_retries {
                    warn!(
                        "Status query for task '{}' failed ({}), giving up after {} attempts.",
                        id, err, retries
                    );
                    self.finish(id, TaskStatus::Failed, tasks);
                } else {
                    warn!(
                        "Status query for task '{}' failed ({}), retry {}/{} in {:?}.",
                        id, err, retries, self.config.max_retries, self.config.retry_delay
                    );
                    self.schedule_retry(id, generation, retries, now);
                }
            }
        }
    }

    /// Current state of a task whose loop is still the one identified by
    /// `generation`. Stops the loop if the task is gone or already terminal.
    fn live_task(&mut self, id: &TaskId, generation: u64, tasks: &TaskList) -> Option<Task> {
        match self.active.get(id) {
            Some(handles) if handles.generation == generation => {}
            _ => return None,
        }
        match tasks.snapshot(id) {
            Some(task) if !task.status.is_terminal() => Some(task),
            _ => {
                self.cancel_polling(id);
                None
            }
        }
    }

    fn issue_query<B>(&mut self, id: &TaskId, generation: u64, attempt: u32, now: Instant, backend: &mut B)
    where
        B: TaskBackend + ?Sized,
    {
        self.queries += 1;
        let outcome = backend.query_status(id);
        if let Some(handles) = self.active.get_mut(id) {
            handles.in_flight = true;
        }
        self.timers.schedule_once(
            now + self.config.query_latency,
            PollEvent::Settle {
                id: id.clone(),
                generation,
                attempt,
                outcome,
            },
        );
    }

    fn schedule_retry(&mut self, id: &TaskId, generation: u64, attempt: u32, now: Instant) {
        let retry = self.timers.schedule_once(
            now + self.config.retry_delay,
            PollEvent::Retry {
                id: id.clone(),
                generation,
                attempt,
            },
        );
        if let Some(handles) = self.active.get_mut(id) {
            if let Some(previous) = handles.retry.replace(retry) {
                self.timers.cancel(previous);
            }
        }
    }

    fn finish(&mut self, id: &TaskId, status: TaskStatus, tasks: &mut TaskList) {
        if let Err(e) = tasks.set_status(id, status) {
            warn!("Could not finish task '{}': {}", id, e);
        }
        self.cancel_polling(id);
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
