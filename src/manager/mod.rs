pub mod task_manager;
pub mod tracker;

pub use task_manager::TaskManager;
pub use tracker::UploadTracker;
