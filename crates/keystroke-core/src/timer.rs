#![forbid(unsafe_code)]

//! Deterministic time and one-shot timers.
//!
//! Playback is host-driven: nothing sleeps and nothing reads the wall clock.
//! The host advances a [`DeterministicClock`]; due entries are popped from a
//! [`TimerQueue`] in deadline order and handed back to their owner, which may
//! schedule its next one-shot timer from inside the callback.
//!
//! # Invariants
//!
//! 1. Entries fire in ascending deadline order; equal deadlines fire in
//!    scheduling order.
//! 2. A cancelled entry never fires, even if it is still in the heap.
//! 3. [`TimerQueue::len`] counts live (scheduled, not fired, not cancelled)
//!    entries only.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use rustc_hash::FxHashSet;

use crate::logging::{debug, trace};

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// Handle to one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A timer popped from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<O> {
    pub id: TimerId,
    pub deadline: Duration,
    pub owner: O,
}

#[derive(Debug)]
struct Entry<O> {
    deadline: Duration,
    id: TimerId,
    owner: O,
}

impl<O> PartialEq for Entry<O> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<O> Eq for Entry<O> {}

impl<O> PartialOrd for Entry<O> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<O> Ord for Entry<O> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the earliest deadline, then the earliest id, is "greatest".
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Min-deadline queue of one-shot timers with cancellation.
#[derive(Debug)]
pub struct TimerQueue<O> {
    heap: BinaryHeap<Entry<O>>,
    live: FxHashSet<TimerId>,
    next_id: u64,
}

impl<O> Default for TimerQueue<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> TimerQueue<O> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: FxHashSet::default(),
            next_id: 0,
        }
    }

    /// Schedule a timer firing `delay` after `now`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, owner: O) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = now.saturating_add(delay);
        trace!(timer = id.0, deadline_us = deadline.as_micros() as u64, "timer scheduled");
        self.heap.push(Entry {
            deadline,
            id,
            owner,
        });
        self.live.insert(id);
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.live.remove(&id);
        if removed {
            trace!(timer = id.0, "timer cancelled");
        }
        if self.live.is_empty() {
            self.heap.clear();
        }
        removed
    }

    /// Pop the earliest live timer whose deadline is at or before `until`.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<O>> {
        self.prune();
        if self.heap.peek()?.deadline > until {
            return None;
        }
        let entry = self.heap.pop()?;
        self.live.remove(&entry.id);
        Some(Fired {
            id: entry.id,
            deadline: entry.deadline,
            owner: entry.owner,
        })
    }

    /// Deadline of the earliest live timer, for hosts that arm a single
    /// one-shot wakeup instead of polling.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.prune();
        self.heap.peek().map(|e| e.deadline)
    }

    /// Number of live timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every timer.
    pub fn clear(&mut self) {
        if !self.live.is_empty() {
            debug!(dropped = self.live.len(), "timer queue cleared");
        }
        self.heap.clear();
        self.live.clear();
    }

    /// Discard cancelled entries sitting at the top of the heap.
    fn prune(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.id) {
                break;
            }
            self.heap.pop();
        }
    }
}
