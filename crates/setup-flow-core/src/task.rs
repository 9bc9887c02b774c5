//! Deferred task queue for the control thread.
//!
//! Requests are posted as discrete tasks and drained later by the owner, so a
//! request issued while a mutation (and its notifications) is still in
//! flight is applied only after that mutation has settled.
//!
//! The queue is generic over its payload. Owners that need access to their
//! own `&mut self` while handling a task post plain data (an enum of
//! requests) and pop it back out instead of storing closures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::targets;

/// A unique identifier for a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Internal task data.
#[derive(Debug)]
struct TaskData<T> {
    id: TaskId,
    payload: T,
}

/// FIFO queue of pending tasks.
#[derive(Debug)]
pub struct TaskQueue<T> {
    tasks: VecDeque<TaskData<T>>,
}

impl<T> TaskQueue<T> {
    /// Create a new, empty task queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a task to the back of the queue.
    ///
    /// Returns the task ID that can be used to cancel the task.
    pub fn post(&mut self, payload: T) -> TaskId {
        let id = next_task_id();
        self.tasks.push_back(TaskData { id, payload });
        tracing::trace!(target: targets::TASK, id = id.as_u64(), pending = self.tasks.len(), "task posted");
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns the payload if the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        self.tasks.remove(pos).map(|t| t.payload)
    }

    /// Pop the oldest pending task.
    pub fn pop(&mut self) -> Option<(TaskId, T)> {
        self.tasks.pop_front().map(|t| (t.id, t.payload))
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Drop every pending task.
    ///
    /// Returns the number of tasks discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        if count > 0 {
            tracing::debug!(target: targets::TASK, count, "discarded pending tasks");
        }
        count
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = TaskQueue::new();
        queue.post("next");
        queue.post("previous");
        queue.post("next");

        let drained: Vec<_> = std::iter::from_fn(|| queue.pop().map(|(_, t)| t)).collect();
        assert_eq!(drained, vec!["next", "previous", "next"]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_cancel() {
        let mut queue = TaskQueue::new();
        let first = queue.post(1);
        let second = queue.post(2);

        assert_eq!(queue.cancel(first), Some(1));
        assert_eq!(queue.cancel(first), None);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.pop(), Some((second, 2)));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut queue = TaskQueue::new();
        let a = queue.post(());
        let b = queue.post(());
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_clear() {
        let mut queue = TaskQueue::new();
        queue.post(1);
        queue.post(2);
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.clear(), 0);
        assert!(queue.pop().is_none());
    }
}
