use crossbeam_channel::Sender;

use crate::error::Result;
use super::task::{Task, TaskId};

/// Commands handled by the control thread. Replies travel back on the
/// embedded one-shot senders.
#[derive(Debug)]
pub enum TaskMessage {
    Submit(String, Sender<Result<TaskId>>),
    Cancel(TaskId, Sender<bool>),
    Get(TaskId, Sender<Option<Task>>),
    List(Sender<Vec<Task>>),
    Shutdown,
}
