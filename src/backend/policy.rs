use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides the simulated backend's timing and outcomes.
pub trait OutcomePolicy: Send {
    /// How long after creation the task finishes.
    fn completion_delay(&mut self) -> Duration;

    /// Whether a finishing task ends up failed.
    fn completion_fails(&mut self) -> bool;

    /// Whether a single status query hits a flaky channel.
    fn transient_fault(&mut self) -> bool;

    /// Delay before a pending task is reported as processing. `None` keeps it
    /// pending until completion.
    fn pickup_delay(&mut self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
    min_delay: Duration,
    max_delay: Duration,
    failure_rate: f64,
    transient_error_rate: f64,
    pickup_delay: Option<Duration>,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min_delay: Duration::from_millis(5000),
            max_delay: Duration::from_millis(10000),
            failure_rate: 0.2,
            transient_error_rate: 0.1,
            pickup_delay: None,
        }
    }

    pub fn with_delay_window(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_transient_error_rate(mut self, rate: f64) -> Self {
        self.transient_error_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_pickup_delay(mut self, delay: Option<Duration>) -> Self {
        self.pickup_delay = delay;
        self
    }
}

impl OutcomePolicy for RandomPolicy {
    fn completion_delay(&mut self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..max))
    }

    fn completion_fails(&mut self) -> bool {
        self.rng.gen_bool(self.failure_rate)
    }

    fn transient_fault(&mut self) -> bool {
        self.rng.gen_bool(self.transient_error_rate)
    }

    fn pickup_delay(&mut self) -> Option<Duration> {
        self.pickup_delay
    }
}

/// Replays queued answers in order, then falls back to fixed defaults
/// (`default_delay`, success, no faults).
#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    delays: VecDeque<Duration>,
    failures: VecDeque<bool>,
    faults: VecDeque<bool>,
    default_delay: Duration,
    pickup_delay: Option<Duration>,
}

impl ScriptedPolicy {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.delays.extend(delays);
        self
    }

    pub fn with_failures(mut self, failures: impl IntoIterator<Item = bool>) -> Self {
        self.failures.extend(failures);
        self
    }

    pub fn with_faults(mut self, faults: impl IntoIterator<Item = bool>) -> Self {
        self.faults.extend(faults);
        self
    }

    pub fn with_pickup_delay(mut self, delay: Duration) -> Self {
        self.pickup_delay = Some(delay);
        self
    }
}

impl OutcomePolicy for ScriptedPolicy {
    fn completion_delay(&mut self) -> Duration {
        self.delays.pop_front().unwrap_or(self.default_delay)
    }

    fn completion_fails(&mut self) -> bool {
        self.failures.pop_front().unwrap_or(false)
    }

    fn transient_fault(&mut self) -> bool {
        self.faults.pop_front().unwrap_or(false)
    }

    fn pickup_delay(&mut self) -> Option<Duration> {
        self.pickup_delay
    }
}
