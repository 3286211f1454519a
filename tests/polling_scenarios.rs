use std::sync::Arc;
use std::time::Duration;

use upload_tracker::backend::{
    BackendStatus, OutcomePolicy, RandomPolicy, ScriptedPolicy, SimulatedBackend, TaskBackend,
};
use upload_tracker::clock::{Clock, ManualClock};
use upload_tracker::error::{BackendError, QueryError};
use upload_tracker::manager::UploadTracker;
use upload_tracker::models::{Task, TaskId, TaskStatus};
use upload_tracker::worker::PollConfig;

/// Simulated backend that records every status query it receives.
struct CountingBackend {
    inner: SimulatedBackend,
    queries: Vec<TaskId>,
}

impl CountingBackend {
    fn queries_for(&self, id: &TaskId) -> usize {
        self.queries.iter().filter(|q| *q == id).count()
    }
}

impl TaskBackend for CountingBackend {
    fn create(&mut self) -> Result<TaskId, BackendError> {
        self.inner.create()
    }

    fn query_status(&mut self, id: &TaskId) -> Result<BackendStatus, QueryError> {
        self.queries.push(id.clone());
        self.inner.query_status(id)
    }

    fn cancel(&mut self, id: &TaskId) {
        self.inner.cancel(id)
    }
}

struct Harness {
    tracker: UploadTracker<CountingBackend>,
    clock: ManualClock,
}

impl Harness {
    fn new(policy: impl OutcomePolicy + 'static) -> Self {
        Self::with_config(policy, PollConfig::default())
    }

    fn with_config(policy: impl OutcomePolicy + 'static, config: PollConfig) -> Self {
        let clock = ManualClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let backend = CountingBackend {
            inner: SimulatedBackend::new(policy, shared.clone()),
            queries: Vec::new(),
        };
        Self {
            tracker: UploadTracker::new(backend, config, shared),
            clock,
        }
    }

    /// Steps the clock from timer to timer until `span` has elapsed.
    fn run_for(&mut self, span: Duration) {
        let end = self.clock.now() + span;
        while let Some(next) = self.tracker.next_deadline() {
            if next > end {
                break;
            }
            self.clock.set(next);
            self.tracker.advance();
        }
        self.clock.set(end);
        self.tracker.advance();
    }

    fn task(&self, id: &TaskId) -> Task {
        self.tracker.task(id).expect("task is tracked")
    }

    fn queries(&self, id: &TaskId) -> usize {
        self.tracker.backend().queries_for(id)
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn three_transient_failures_exhaust_retries() {
    let policy = ScriptedPolicy::new(secs(60)).with_faults([true, true, true]);
    let mut h = Harness::new(policy);
    let id = h.tracker.submit("scan.pdf").unwrap();

    h.run_for(secs(30));

    let task = h.task(&id);
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retries, 3);
    assert_eq!(h.queries(&id), 3);
    assert!(!h.tracker.driver().is_polling(&id));
}

#[test]
fn immediate_success_stops_the_loop() {
    let mut h = Harness::new(ScriptedPolicy::new(Duration::ZERO));
    let id = h.tracker.submit("photo.jpg").unwrap();

    h.run_for(secs(3));

    let task = h.task(&id);
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.retries, 0);
    assert_eq!(h.queries(&id), 1);
    assert_eq!(h.tracker.driver().pending_timers(), 0);
}

#[test]
fn cancel_before_first_tick_never_queries() {
    let mut h = Harness::new(ScriptedPolicy::new(secs(5)));
    let id = h.tracker.submit("photo.jpg").unwrap();

    assert!(h.tracker.cancel(&id));
    h.run_for(secs(30));

    assert_eq!(h.task(&id).status, TaskStatus::Cancelled);
    assert_eq!(h.queries(&id), 0);
}

#[test]
fn reported_task_failure_is_not_retried() {
    let policy = ScriptedPolicy::new(Duration::ZERO).with_failures([true]);
    let mut h = Harness::new(policy);
    let id = h.tracker.submit("photo.jpg").unwrap();

    h.run_for(secs(30));

    let task = h.task(&id);
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retries, 0);
    assert_eq!(h.queries(&id), 1);
}

#[test]
fn retry_firing_after_cancel_does_not_resurrect() {
    let policy = ScriptedPolicy::new(secs(60)).with_faults([true]);
    let mut h = Harness::new(policy);
    let id = h.tracker.submit("scan.pdf").unwrap();

    // tick at 3s fails and arms a retry for 5s
    h.run_for(secs(4));
    assert_eq!(h.task(&id).retries, 1);

    assert!(h.tracker.cancel(&id));
    h.run_for(secs(30));

    assert_eq!(h.task(&id).status, TaskStatus::Cancelled);
    assert_eq!(h.queries(&id), 1);
}

#[test]
fn in_flight_response_after_cancel_is_discarded() {
    let config = PollConfig {
        query_latency: secs(1),
        ..PollConfig::default()
    };
    let mut h = Harness::with_config(ScriptedPolicy::new(Duration::ZERO), config);
    let id = h.tracker.submit("scan.pdf").unwrap();

    // query goes out at 3s and would report success at 4s
    h.run_for(Duration::from_millis(3500));
    assert_eq!(h.queries(&id), 1);
    assert_eq!(h.task(&id).status, TaskStatus::Pending);

    h.tracker.cancel(&id);
    h.run_for(secs(10));

    assert_eq!(h.task(&id).status, TaskStatus::Cancelled);
    assert_eq!(h.tracker.driver().pending_timers(), 0);
}

#[test]
fn cancelling_twice_matches_cancelling_once() {
    let mut once = Harness::new(ScriptedPolicy::new(secs(60)));
    let mut twice = Harness::new(ScriptedPolicy::new(secs(60)));
    let a = once.tracker.submit("a.pdf").unwrap();
    let b = twice.tracker.submit("a.pdf").unwrap();

    once.tracker.cancel(&a);
    twice.tracker.cancel(&b);
    assert!(!twice.tracker.cancel(&b));

    once.run_for(secs(10));
    twice.run_for(secs(10));
    assert_eq!(once.task(&a).status, twice.task(&b).status);
    assert_eq!(once.task(&a).retries, twice.task(&b).retries);
    assert_eq!(once.tracker.driver().pending_timers(), twice.tracker.driver().pending_timers());
}

#[test]
fn finished_task_gets_no_more_queries() {
    let mut h = Harness::new(ScriptedPolicy::new(secs(4)));
    let id = h.tracker.submit("photo.jpg").unwrap();

    h.run_for(secs(6));
    assert_eq!(h.task(&id).status, TaskStatus::Success);
    let queries = h.queries(&id);

    h.run_for(secs(60));
    assert_eq!(h.queries(&id), queries);
}

#[test]
fn processing_is_reported_when_backend_picks_up() {
    let policy = ScriptedPolicy::new(secs(8)).with_pickup_delay(secs(1));
    let mut h = Harness::new(policy);
    let id = h.tracker.submit("photo.jpg").unwrap();

    h.run_for(secs(3));
    assert_eq!(h.task(&id).status, TaskStatus::Processing);
    h.run_for(secs(6));
    assert_eq!(h.task(&id).status, TaskStatus::Success);
}

#[test]
fn recovered_query_resets_retries() {
    let policy = ScriptedPolicy::new(secs(60)).with_faults([true, true]);
    let mut h = Harness::new(policy);
    let id = h.tracker.submit("photo.jpg").unwrap();

    h.run_for(Duration::from_millis(5500));
    assert_eq!(h.task(&id).retries, 2);
    h.run_for(secs(2));
    assert_eq!(h.task(&id).retries, 0);
    assert_eq!(h.task(&id).status, TaskStatus::Pending);
}

#[test]
fn shutdown_releases_every_timer() {
    let mut h = Harness::new(ScriptedPolicy::new(secs(60)));
    let ids: Vec<_> = (0..3)
        .map(|i| h.tracker.submit(format!("file{i}.png")).unwrap())
        .collect();

    h.tracker.shutdown();
    assert_eq!(h.tracker.driver().active_count(), 0);
    assert_eq!(h.tracker.next_deadline(), None);

    h.run_for(secs(60));
    for id in &ids {
        assert_eq!(h.queries(id), 0);
    }
}

#[test]
fn statuses_only_move_forward_under_random_noise() {
    for seed in 0..25 {
        let policy = RandomPolicy::new(Some(seed))
            .with_transient_error_rate(0.3)
            .with_pickup_delay(Some(secs(2)));
        let mut h = Harness::new(policy);
        let ids: Vec<_> = (0..4)
            .map(|i| h.tracker.submit(format!("doc{i}.pdf")).unwrap())
            .collect();
        let mut last: Vec<TaskStatus> = ids.iter().map(|_| TaskStatus::Pending).collect();

        for step in 0..300 {
            if step == 40 {
                h.tracker.cancel(&ids[0]);
            }
            h.run_for(Duration::from_millis(100));

            for (i, id) in ids.iter().enumerate() {
                let task = h.task(id);
                assert!(
                    last[i] == task.status || last[i].can_transition_to(task.status),
                    "seed {seed}: {} -> {}",
                    last[i],
                    task.status
                );
                assert!(task.retries <= 3, "seed {seed}: retries {}", task.retries);
                if task.status == TaskStatus::Cancelled {
                    assert_eq!(i, 0, "only the cancelled task may end cancelled");
                }
                last[i] = task.status;
            }
        }

        // 30 simulated seconds is past every completion window
        assert!(last.iter().all(|s| s.is_terminal()), "seed {seed}: {last:?}");
        assert_eq!(h.tracker.driver().active_count(), 0);
    }
}
