//! Deferred work keyed on simulated time.
//!
//! Customers wait between stages (browsing, idling, being served); each
//! wait is a [`Task`] due at an absolute sim-millisecond. Tasks due at the
//! same instant fire in the order they were scheduled.

use crate::types::{EntityId, SimMillis};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BinaryHeap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Browsing is over; resolve purchases.
    FinishShopping { customer_id: EntityId },
    /// Customer who bought nothing leaves.
    IdleCheck { customer_id: EntityId },
    /// Till service is complete; take payment.
    FinishCheckout { customer_id: EntityId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    due_ms: SimMillis,
    seq:    u64,
    task:   Task,
}

// Reversed so the BinaryHeap (a max-heap) pops the earliest task.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    heap:     BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: SimMillis, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due_ms, seq, task });
    }

    /// Remove and return every task due at or before `now_ms`, earliest first.
    pub fn pop_due(&mut self, now_ms: SimMillis) -> Vec<Task> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|s| s.due_ms <= now_ms) {
            if let Some(s) = self.heap.pop() {
                due.push(s.task);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<SimMillis> {
        self.heap.peek().map(|s| s.due_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
