//! Submit files for background processing and track each task until it
//! succeeds, fails or is cancelled.
//!
//! A [`manager::UploadTracker`] ties together the [`models::TaskList`], a
//! [`backend::TaskBackend`] and the [`worker::PollingDriver`] that polls it.
//! [`manager::TaskManager`] runs a tracker on its own control thread and is
//! what the interactive CLI talks to.

pub mod app;
pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod timer;
pub mod worker;

pub use error::{Result, TrackerError};
