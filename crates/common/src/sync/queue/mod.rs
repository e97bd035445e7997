// In-process work queue with at-least-once delivery semantics

mod core;
mod errors;
pub mod metrics;
mod types;

pub use self::core::WorkQueue;
pub use self::errors::{QueueError, QueueResult};
pub use self::metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use self::types::{ItemStatus, QueueConfig, QueueItem};
