use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use super::errors::{QueueError, QueueResult};
use super::metrics::QueueMetrics;
use super::types::{ItemStatus, QueueConfig, QueueItem};

#[derive(Debug)]
struct QueueState<T> {
    ready: VecDeque<QueueItem<T>>,
    in_flight: HashMap<u64, QueueItem<T>>,
    next_id: u64,
}

impl<T> QueueState<T> {
    fn size(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }
}

/// In-process FIFO work queue with explicit acknowledgement
///
/// Items handed out by [`WorkQueue::pop_batch`] stay in flight until the
/// consumer calls [`WorkQueue::ack`] or [`WorkQueue::requeue`]; a requeued
/// item goes back to the front so redelivery keeps the original order.
///
/// ```
/// use cachefront_common::sync::queue::{QueueConfig, WorkQueue};
///
/// # tokio_test::block_on(async {
/// let queue = WorkQueue::with_config(QueueConfig::default()).unwrap();
/// queue.push("k1".to_string()).unwrap();
///
/// let batch = queue.pop_batch(10).unwrap();
/// assert_eq!(batch[0].payload, "k1");
/// queue.ack(&[batch[0].id]).unwrap();
/// assert!(queue.is_empty());
/// # });
/// ```
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    config: QueueConfig,
    metrics: Arc<QueueMetrics>,
    shutdown: AtomicBool,
    notify: Notify,
}

impl<T> WorkQueue<T>
where
    T: Clone + Send,
{
    /// Create a new queue with custom configuration
    pub fn with_config(config: QueueConfig) -> QueueResult<Self> {
        config.validate().map_err(QueueError::InvalidConfig)?;

        Ok(Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
                next_id: 0,
            }),
            config,
            metrics: Arc::new(QueueMetrics::new()),
            shutdown: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    /// Push an item to the back of the queue, returning its id
    #[instrument(skip(self, payload))]
    pub fn push(&self, payload: T) -> QueueResult<u64> {
        if self.shutdown.load(AtomicOrdering::Relaxed) {
            return Err(QueueError::ShuttingDown);
        }

        let mut state = self.state.lock();

        if state.size() >= self.config.max_capacity {
            self.metrics.record_capacity_rejection();
            return Err(QueueError::CapacityExceeded(self.config.max_capacity));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.ready.push_back(QueueItem {
            id,
            payload,
            attempts: 0,
            status: ItemStatus::Ready,
            enqueued_at: Instant::now(),
        });

        self.metrics.record_enqueue(1);
        self.metrics.update_size(state.size());
        drop(state);

        self.notify.notify_one();
        debug!(item_id = id, "Item enqueued");
        Ok(id)
    }

    /// Hand out up to `max_items` ready items, marking them in flight
    pub fn pop_batch(&self, max_items: usize) -> QueueResult<Vec<QueueItem<T>>> {
        if self.shutdown.load(AtomicOrdering::Relaxed) {
            return Err(QueueError::ShuttingDown);
        }

        let mut state = self.state.lock();
        let take = max_items.min(state.ready.len());
        let mut batch = Vec::with_capacity(take);

        for mut item in state.ready.drain(..take).collect::<Vec<_>>() {
            item.status = ItemStatus::InFlight;
            state.in_flight.insert(item.id, item.clone());
            batch.push(item);
        }

        if !batch.is_empty() {
            self.metrics.record_dequeue(batch.len() as u64);
            debug!(count = batch.len(), "Batch dequeued");
        }

        Ok(batch)
    }

    /// Like [`WorkQueue::pop_batch`], but waits up to `timeout` for the first
    /// item to arrive
    pub async fn pop_batch_wait(
        &self,
        max_items: usize,
        timeout: Duration,
    ) -> QueueResult<Vec<QueueItem<T>>> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            let batch = self.pop_batch(max_items)?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(batch);
            }

            tokio::select! {
                _ = notified => continue,
                _ = tokio::time::sleep(remaining) => return Ok(Vec::new()),
            }
        }
    }

    /// Acknowledge in-flight items, removing them for good
    ///
    /// Fails on the first id that is not in flight; ids before it stay
    /// acknowledged.
    pub fn ack(&self, ids: &[u64]) -> QueueResult<()> {
        let mut state = self.state.lock();

        for id in ids {
            if state.in_flight.remove(id).is_none() {
                self.metrics.update_size(state.size());
                return Err(QueueError::ItemNotFound(*id));
            }
            self.metrics.record_ack(1);
        }

        self.metrics.update_size(state.size());
        Ok(())
    }

    /// Return in-flight items to the front of the queue for redelivery
    ///
    /// Items that exhausted `max_attempts` are dropped instead. Returns the
    /// number of items made ready again.
    pub fn requeue(&self, ids: &[u64]) -> QueueResult<usize> {
        let mut state = self.state.lock();
        let mut returned = Vec::with_capacity(ids.len());

        for id in ids {
            let mut item = state.in_flight.remove(id).ok_or(QueueError::ItemNotFound(*id))?;
            item.attempts += 1;
            item.status = ItemStatus::Ready;

            if self.config.max_attempts.is_some_and(|max| item.attempts >= max) {
                warn!(item_id = item.id, attempts = item.attempts, "Dropping item after max attempts");
                self.metrics.record_dropped(1);
            } else {
                returned.push(item);
            }
        }

        let count = returned.len();
        for item in returned.into_iter().rev() {
            state.ready.push_front(item);
        }

        self.metrics.record_requeue(count as u64);
        self.metrics.update_size(state.size());
        drop(state);

        if count > 0 {
            self.notify.notify_one();
        }
        Ok(count)
    }

    /// Number of items waiting to be handed out
    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Number of items handed out and not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// True when nothing is ready and nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.state.lock().size() == 0
    }

    /// Stop accepting pushes and pops; wakes any waiter
    pub fn shutdown(&self) {
        self.shutdown.store(true, AtomicOrdering::Relaxed);
        self.notify.notify_waiters();
    }

    /// Whether [`WorkQueue::shutdown`] was called
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(AtomicOrdering::Relaxed)
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<QueueMetrics> {
        Arc::clone(&self.metrics)
    }
}
