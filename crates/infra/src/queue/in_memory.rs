//! In-process queue client over the common work queue
//!
//! Delivery is at-least-once: a batch is acknowledged only after the
//! processor returns `Ok`, and a failed batch is requeued after one poll
//! interval. Batch processing runs on up to `max_background_tasks` tasks and
//! dispatch is paced to `max_processing_rate` messages per second.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachefront_common::sync::{QueueConfig, QueueError, QueueItem, QueueMetricsSnapshot, WorkQueue};
use cachefront_core::{MessageProcessor, QueueClient};
use cachefront_domain::{BackendError, BackendResult, QueueSettings};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// Queue client whose messages never leave the process
#[derive(Clone)]
pub struct InMemoryQueueClient {
    queue: Arc<WorkQueue<String>>,
}

impl InMemoryQueueClient {
    pub fn new() -> BackendResult<Self> {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> BackendResult<Self> {
        let queue = WorkQueue::with_config(config).map_err(map_queue_error)?;
        Ok(Self { queue: Arc::new(queue) })
    }

    /// Messages waiting for delivery
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Messages handed to a processor and not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.queue.metrics().snapshot()
    }

    /// Stop accepting messages and wake any waiting delivery loop
    pub fn close(&self) {
        self.queue.shutdown();
    }

    async fn delivery_loop(
        queue: Arc<WorkQueue<String>>,
        settings: QueueSettings,
        processor: Arc<dyn MessageProcessor>,
        cancellation: CancellationToken,
    ) {
        let permits = Arc::new(Semaphore::new(settings.max_background_tasks));
        let mut tasks = JoinSet::new();

        info!(
            batch_size = settings.batch_size,
            workers = settings.max_background_tasks,
            rate = settings.max_processing_rate,
            "Queue delivery loop started"
        );

        loop {
            while let Some(finished) = tasks.try_join_next() {
                if let Err(err) = finished {
                    warn!(error = %err, "Batch task ended abnormally");
                }
            }

            let permit = tokio::select! {
                () = cancellation.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let batch = tokio::select! {
                () = cancellation.cancelled() => break,
                batch = queue.pop_batch_wait(settings.batch_size, settings.poll_interval()) => batch,
            };

            let items = match batch {
                Ok(items) if items.is_empty() => continue,
                Ok(items) => items,
                Err(QueueError::ShuttingDown) => {
                    debug!("Queue shut down, stopping delivery");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "Failed to dequeue batch");
                    continue;
                }
            };

            let pace = pace_for(items.len(), settings.max_processing_rate);
            let queue = Arc::clone(&queue);
            let processor = Arc::clone(&processor);
            let retry_delay = settings.poll_interval();
            tasks.spawn(async move {
                let _permit = permit;
                Self::process_batch(&queue, processor.as_ref(), items, retry_delay).await;
            });

            tokio::select! {
                () = cancellation.cancelled() => break,
                () = tokio::time::sleep(pace) => {}
            }
        }

        while let Some(finished) = tasks.join_next().await {
            if let Err(err) = finished {
                warn!(error = %err, "Batch task ended abnormally");
            }
        }
        info!("Queue delivery loop stopped");
    }

    async fn process_batch(
        queue: &WorkQueue<String>,
        processor: &dyn MessageProcessor,
        items: Vec<QueueItem<String>>,
        retry_delay: Duration,
    ) {
        let ids: Vec<u64> = items.iter().map(|item| item.id).collect();
        let payloads: Vec<String> = items.into_iter().map(|item| item.payload).collect();

        match processor.process(&payloads).await {
            Ok(()) => {
                if let Err(err) = queue.ack(&ids) {
                    warn!(error = %err, "Failed to acknowledge batch");
                }
                debug!(count = ids.len(), "Batch acknowledged");
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "Batch failed, scheduling redelivery");
                tokio::time::sleep(retry_delay).await;
                match queue.requeue(&ids) {
                    Ok(requeued) if requeued < ids.len() => {
                        warn!(dropped = ids.len() - requeued, "Messages exceeded delivery attempts");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "Failed to requeue batch"),
                }
            }
        }
    }
}

/// Time to wait after dispatching `count` messages to stay under `rate`/s
fn pace_for(count: usize, rate: u32) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(count as f64 / f64::from(rate))
}

fn map_queue_error(err: QueueError) -> BackendError {
    BackendError::from(InfraError::from(err))
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn enqueue(&self, payload: String) -> BackendResult<()> {
        self.queue.push(payload).map(|_| ()).map_err(map_queue_error)
    }

    fn dequeue_and_process(
        &self,
        settings: QueueSettings,
        processor: Arc<dyn MessageProcessor>,
        cancellation: CancellationToken,
    ) -> BackendResult<JoinHandle<()>> {
        let runtime = Handle::try_current()
            .map_err(|err| BackendError::Unavailable(format!("no async runtime: {err}")))?;

        Ok(runtime.spawn(Self::delivery_loop(Arc::clone(&self.queue), settings, processor, cancellation)))
    }
}
