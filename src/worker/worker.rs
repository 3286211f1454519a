use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info};

use crate::backend::TaskBackend;
use crate::manager::tracker::UploadTracker;
use crate::models::message::TaskMessage;

/// Upper bound on how long the loop sleeps when no timer is armed.
const IDLE_WAIT: Duration = Duration::from_secs(60);

/// Runs the tracker on a dedicated control thread. Commands and timer
/// firings are handled one at a time, so the tracker is never touched
/// concurrently.
pub fn spawn_worker_thread<B>(receiver: Receiver<TaskMessage>, mut tracker: UploadTracker<B>) -> JoinHandle<()>
where
    B: TaskBackend + Send + 'static,
{
    thread::spawn(move || {
        loop {
            let wait = match tracker.next_deadline() {
                Some(deadline) => deadline.saturating_duration_since(tracker.now()),
                None => IDLE_WAIT,
            };

            match receiver.recv_timeout(wait) {
                Ok(TaskMessage::Shutdown) => break,
                Ok(message) => handle_message(message, &mut tracker),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Task manager dropped without shutting down the worker.");
                    break;
                }
            }

            let fired = tracker.advance();
            if fired > 0 {
                debug!("Fired {} polling timer(s).", fired);
            }
        }

        tracker.shutdown();
        info!("Worker thread stopped.");
    })
}

fn handle_message<B: TaskBackend>(message: TaskMessage, tracker: &mut UploadTracker<B>) {
    match message {
        TaskMessage::Submit(filename, reply) => {
            if reply.send(tracker.submit(filename)).is_err() {
                error!("Submit reply receiver dropped.");
            }
        }
        TaskMessage::Cancel(id, reply) => {
            if reply.send(tracker.cancel(&id)).is_err() {
                error!("Cancel reply receiver dropped.");
            }
        }
        TaskMessage::Get(id, reply) => {
            let _ = reply.send(tracker.task(&id));
        }
        TaskMessage::List(reply) => {
            let _ = reply.send(tracker.tasks());
        }
        TaskMessage::Shutdown => {}
    }
}
