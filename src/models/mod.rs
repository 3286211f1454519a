pub mod message;
pub mod task;
pub mod task_list;

pub use task::{Task, TaskId, TaskStatus};
pub use task_list::TaskList;
