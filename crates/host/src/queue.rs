use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use dispatchsim_domain::Task;

struct QueueEntry {
    priority: u8,
    seq: u64,
    task: Arc<Task>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; among equal priorities, lower sequence
        // number (earlier insertion) first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending tasks.
///
/// Ordered by descending priority. Tasks of equal priority leave in
/// insertion order: every push takes a fresh sequence number, so a task
/// that is re-inserted after a preemption queues behind equal-priority
/// tasks that arrived while it ran.
pub struct TaskQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, task: Arc<Task>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry {
            priority: task.priority(),
            seq,
            task,
        });
    }

    /// Removes and returns the highest-priority task.
    pub fn pop(&mut self) -> Option<Arc<Task>> {
        self.heap.pop().map(|entry| entry.task)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sum of the remaining work of all queued tasks.
    pub fn work_left(&self) -> Duration {
        self.heap
            .iter()
            .map(|entry| entry.task.remaining())
            .sum()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
