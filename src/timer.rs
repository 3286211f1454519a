//! Owned timer registry.
//!
//! A `TimerQueue` holds one-shot and repeating timers, each addressed by the
//! [`TimerId`] returned when it was scheduled. Nothing fires on its own: the
//! owner asks for due events with [`TimerQueue::pop_due`] and decides how long
//! to sleep with [`TimerQueue::next_deadline`]. Cancelled timers are dropped from
//! the registry immediately and their heap entries are skipped lazily.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<E> {
    event: E,
    deadline: Instant,
    period: Option<Duration>,
    seq: u64,
}

#[derive(Debug)]
pub struct TimerQueue<E> {
    heap: BinaryHeap<Reverse<(Instant, u64, TimerId)>>,
    entries: HashMap<TimerId, Entry<E>>,
    next_id: u64,
    next_seq: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }
}

impl<E: Clone> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, deadline: Instant, event: E) -> TimerId {
        self.insert(deadline, None, event)
    }

    /// First fires at `first`, then every `period` until cancelled.
    pub fn schedule_repeating(&mut self, first: Instant, period: Duration, event: E) -> TimerId {
        self.insert(first, Some(period), event)
    }

    /// Returns `false` if the timer already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Pops the earliest timer whose deadline is `<= now`. Ties fire in
    /// scheduling order. A repeating timer is re-armed one period after the
    /// deadline it fired for; missed periods are coalesced into one firing.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, E)> {
        while let Some(&Reverse((deadline, seq, id))) = self.heap.peek() {
            if deadline > now {
                return None;
            }
            self.heap.pop();

            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.seq != seq {
                continue;
            }

            let period = entry.period;
            match period {
                Some(period) => {
                    let mut next = deadline + period;
                    if next <= now {
                        next = now + period;
                    }
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    entry.deadline = next;
                    entry.seq = seq;
                    self.heap.push(Reverse((next, seq, id)));
                    return Some((id, entry.event.clone()));
                }
                None => {
                    let entry = self.entries.remove(&id)?;
                    return Some((id, entry.event));
                }
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, deadline: Instant, period: Option<Duration>, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            Entry {
                event,
                deadline,
                period,
                seq,
            },
        );
        self.heap.push(Reverse((deadline, seq, id)));
        id
    }
}
