use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

use serde::Serialize;

/// Queue metrics for monitoring
#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub total_enqueued: AtomicU64,
    pub total_dequeued: AtomicU64,
    pub total_acked: AtomicU64,
    pub total_requeued: AtomicU64,
    pub total_dropped: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub current_size: AtomicUsize,
    pub queue_depth_max: AtomicUsize,
}

impl QueueMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueue(&self, count: u64) {
        self.total_enqueued.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub fn record_dequeue(&self, count: u64) {
        self.total_dequeued.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub fn record_ack(&self, count: u64) {
        self.total_acked.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub fn record_requeue(&self, count: u64) {
        self.total_requeued.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.total_dropped.fetch_add(count, AtomicOrdering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Update current size and the high-water mark
    pub fn update_size(&self, size: usize) {
        self.current_size.store(size, AtomicOrdering::Relaxed);
        self.queue_depth_max.fetch_max(size, AtomicOrdering::Relaxed);
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            total_enqueued: self.total_enqueued.load(AtomicOrdering::Relaxed),
            total_dequeued: self.total_dequeued.load(AtomicOrdering::Relaxed),
            total_acked: self.total_acked.load(AtomicOrdering::Relaxed),
            total_requeued: self.total_requeued.load(AtomicOrdering::Relaxed),
            total_dropped: self.total_dropped.load(AtomicOrdering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(AtomicOrdering::Relaxed),
            current_size: self.current_size.load(AtomicOrdering::Relaxed),
            queue_depth_max: self.queue_depth_max.load(AtomicOrdering::Relaxed),
        }
    }
}

/// Serializable copy of [`QueueMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueMetricsSnapshot {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub total_acked: u64,
    pub total_requeued: u64,
    pub total_dropped: u64,
    pub capacity_rejections: u64,
    pub current_size: usize,
    pub queue_depth_max: usize,
}
