use std::time::Instant;

/// Delivery state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Waiting to be handed to a consumer
    Ready,
    /// Handed to a consumer, awaiting ack or requeue
    InFlight,
}

impl_status_conversions!(ItemStatus {
    Ready => "ready",
    InFlight => "in_flight",
});

/// A payload plus delivery bookkeeping
#[derive(Debug, Clone)]
pub struct QueueItem<T> {
    /// Monotonic id assigned at push time
    pub id: u64,
    pub payload: T,
    /// Number of times the item was handed out and requeued
    pub attempts: u32,
    pub status: ItemStatus,
    pub enqueued_at: Instant,
}

/// Queue limits
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Ready + in-flight items the queue accepts before rejecting pushes
    pub max_capacity: usize,
    /// Requeues allowed before an item is dropped; `None` redelivers forever
    pub max_attempts: Option<u32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_capacity: 100_000, max_attempts: None }
    }
}

impl QueueConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_capacity == 0 {
            return Err("Max capacity must be greater than 0".to_string());
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
