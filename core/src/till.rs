//! Single checkout till with a strict FIFO queue.

use crate::{
    error::{SimError, SimResult},
    types::EntityId,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Till {
    queue:   VecDeque<EntityId>,
    serving: Option<EntityId>,
}

impl Till {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the back of the queue. Returns the 1-based queue position.
    pub fn enqueue(&mut self, customer_id: EntityId) -> usize {
        self.queue.push_back(customer_id);
        self.queue.len()
    }

    /// Move the front of the queue to the till if it is free.
    pub fn admit_next(&mut self) -> Option<EntityId> {
        if self.serving.is_some() {
            return None;
        }
        let next = self.queue.pop_front()?;
        self.serving = Some(next.clone());
        Some(next)
    }

    /// Release the till after `customer_id` has been served.
    pub fn finish(&mut self, customer_id: &str) -> SimResult<()> {
        match &self.serving {
            Some(id) if id == customer_id => {
                self.serving = None;
                Ok(())
            }
            _ => Err(SimError::CustomerNotFound { customer_id: customer_id.to_string() }),
        }
    }

    pub fn serving(&self) -> Option<&EntityId> {
        self.serving.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.serving.is_some()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
