//! Runtime configuration.
//!
//! Every value can come from a command-line flag or an `UPLOAD_TRACKER_*`
//! environment variable:
//!
//! ```bash
//! upload-tracker --poll-interval-ms 1000 --transient-error-rate 0.3
//! UPLOAD_TRACKER_SEED=7 upload-tracker
//! ```

use std::time::Duration;

use clap::Parser;

use crate::backend::RandomPolicy;
use crate::error::{Result, TrackerError};
use crate::worker::driver::PollConfig;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_COMPLETION_MIN_MS: u64 = 5000;
pub const DEFAULT_COMPLETION_MAX_MS: u64 = 10000;
pub const DEFAULT_FAILURE_RATE: f64 = 0.2;
pub const DEFAULT_TRANSIENT_ERROR_RATE: f64 = 0.1;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "upload-tracker")]
#[command(about = "Submit files for background processing and track them to completion")]
#[command(version)]
pub struct Config {
    /// How often each task's status is queried
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, env = "UPLOAD_TRACKER_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Delay before a failed status query is retried
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS, env = "UPLOAD_TRACKER_RETRY_DELAY_MS")]
    pub retry_delay_ms: u64,

    /// Consecutive failed queries before a task is marked failed
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, env = "UPLOAD_TRACKER_MAX_RETRIES")]
    pub max_retries: u32,

    /// Extra latency before a query result is applied
    #[arg(long, default_value_t = 0, env = "UPLOAD_TRACKER_QUERY_LATENCY_MS")]
    pub query_latency_ms: u64,

    /// Shortest simulated processing time
    #[arg(long, default_value_t = DEFAULT_COMPLETION_MIN_MS, env = "UPLOAD_TRACKER_COMPLETION_MIN_MS")]
    pub completion_min_ms: u64,

    /// Longest simulated processing time (exclusive)
    #[arg(long, default_value_t = DEFAULT_COMPLETION_MAX_MS, env = "UPLOAD_TRACKER_COMPLETION_MAX_MS")]
    pub completion_max_ms: u64,

    /// Delay before the simulated backend reports a task as processing
    #[arg(long, env = "UPLOAD_TRACKER_PICKUP_DELAY_MS")]
    pub pickup_delay_ms: Option<u64>,

    /// Probability that a simulated task finishes as failed
    #[arg(long, default_value_t = DEFAULT_FAILURE_RATE, env = "UPLOAD_TRACKER_FAILURE_RATE")]
    pub failure_rate: f64,

    /// Probability that a single status query hits a network error
    #[arg(long, default_value_t = DEFAULT_TRANSIENT_ERROR_RATE, env = "UPLOAD_TRACKER_TRANSIENT_ERROR_RATE")]
    pub transient_error_rate: f64,

    /// Seed for the simulated backend, for reproducible runs
    #[arg(long, env = "UPLOAD_TRACKER_SEED")]
    pub seed: Option<u64>,

    /// Largest file accepted for upload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "UPLOAD_TRACKER_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            query_latency_ms: 0,
            completion_min_ms: DEFAULT_COMPLETION_MIN_MS,
            completion_max_ms: DEFAULT_COMPLETION_MAX_MS,
            pickup_delay_ms: None,
            failure_rate: DEFAULT_FAILURE_RATE,
            transient_error_rate: DEFAULT_TRANSIENT_ERROR_RATE,
            seed: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TrackerError::Config("poll interval must be positive".into()));
        }
        if self.completion_min_ms > self.completion_max_ms {
            return Err(TrackerError::Config(format!(
                "completion window is inverted: {}ms > {}ms",
                self.completion_min_ms, self.completion_max_ms
            )));
        }
        for (name, rate) in [
            ("failure rate", self.failure_rate),
            ("transient error rate", self.transient_error_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(TrackerError::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries,
            query_latency: Duration::from_millis(self.query_latency_ms),
        }
    }

    pub fn policy(&self) -> RandomPolicy {
        RandomPolicy::new(self.seed)
            .with_delay_window(
                Duration::from_millis(self.completion_min_ms),
                Duration::from_millis(self.completion_max_ms),
            )
            .with_failure_rate(self.failure_rate)
            .with_transient_error_rate(self.transient_error_rate)
            .with_pickup_delay(self.pickup_delay_ms.map(Duration::from_millis))
    }
}
