//! One-shot timers for the control thread.
//!
//! Timers carry a payload that is handed back when they fire. The caller
//! supplies the current [`Instant`] both when arming a timer and when
//! polling for expired ones, which keeps firing deterministic under test.
//! Dropping or [`clear`](TimerManager::clear)ing the manager cancels every
//! pending timer.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Manages pending one-shot timers.
#[derive(Debug)]
pub struct TimerManager<T> {
    /// Armed timers and their payloads.
    timers: SlotMap<TimerId, T>,
    /// Priority queue of pending fires.
    queue: BinaryHeap<TimerQueueEntry>,
}

impl<T> TimerManager<T> {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Arm a one-shot timer that fires `delay` after `now`.
    pub fn start_one_shot(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        let fire_time = now + delay;
        let id = self.timers.insert(payload);
        self.queue.push(TimerQueueEntry { id, fire_time });
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "timer armed");
        id
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Remove and return every timer whose fire time is at or before `now`,
    /// earliest first.
    #[tracing::instrument(skip(self), target = "setup_flow_core::timer", level = "trace")]
    pub fn process_expired(&mut self, now: Instant) -> Vec<(TimerId, T)> {
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.fire_time > now {
                break;
            }
            let Some(entry) = self.queue.pop() else {
                break;
            };
            if let Some(payload) = self.timers.remove(entry.id) {
                tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
                fired.push((entry.id, payload));
            }
        }

        fired
    }

    /// Cancel every pending timer.
    ///
    /// Returns the number of timers cancelled.
    pub fn clear(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        self.queue.clear();
        if count > 0 {
            tracing::debug!(target: targets::TIMER, count, "cancelled pending timers");
        }
        count
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl<T> Default for TimerManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
