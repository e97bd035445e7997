//! Synchronization primitives for background delivery
//!
//! - **`queue`**: in-process work queue with explicit ack/requeue, backing the
//!   in-memory queue client used for write-behind notifications

pub mod queue;

pub use queue::{
    ItemStatus, QueueConfig, QueueError, QueueItem, QueueMetrics, QueueMetricsSnapshot,
    QueueResult, WorkQueue,
};
