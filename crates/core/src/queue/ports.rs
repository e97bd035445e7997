//! Port interfaces for queued key notifications

use std::sync::Arc;

use async_trait::async_trait;
use cachefront_domain::{BackendResult, CacheResult, QueueSettings};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Consumer of delivered message batches
///
/// A batch counts as acknowledged only when `process` returns `Ok`;
/// otherwise the transport redelivers it.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, messages: &[String]) -> CacheResult<()>;

    /// Process a single message through the batch path
    async fn process_one(&self, message: &str) -> CacheResult<()> {
        self.process(&[message.to_string()]).await
    }
}

/// At-least-once transport for key notifications
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn enqueue(&self, payload: String) -> BackendResult<()>;

    /// Start a background loop delivering batches to `processor` until
    /// `cancellation` fires
    fn dequeue_and_process(
        &self,
        settings: QueueSettings,
        processor: Arc<dyn MessageProcessor>,
        cancellation: CancellationToken,
    ) -> BackendResult<JoinHandle<()>>;
}
