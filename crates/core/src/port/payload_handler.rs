// Payload Handler Port
// Business logic invoked once per delivered message

use crate::application::scheduler::ShutdownToken;
use crate::domain::{Attributes, OutboundMessage, QueueDescriptor};
use crate::port::{QueueClient, QueueError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A single delivered message as seen by a handler
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub body: String,
    /// Can be used to extend or shrink the current lease
    pub receipt: String,
    pub queue_rank: usize,
    pub attributes: Attributes,
}

/// Normalized processing failure
///
/// Whatever went wrong (decode, business logic, downstream call, panic)
/// ends up here with the original cause attached.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct PayloadProcessingError {
    reason: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl PayloadProcessingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn panicked(panic_msg: impl AsRef<str>) -> Self {
        Self::new(format!("handler panicked: {}", panic_msg.as_ref()))
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<QueueError> for PayloadProcessingError {
    fn from(err: QueueError) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

impl From<serde_json::Error> for PayloadProcessingError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(format!("payload deserialization failed: {err}"), err)
    }
}

/// Capabilities available to a handler while it processes one delivery
#[derive(Clone)]
pub struct HandlerContext {
    queue: QueueDescriptor,
    client: Arc<dyn QueueClient>,
    shutdown: ShutdownToken,
}

impl HandlerContext {
    pub fn new(queue: QueueDescriptor, client: Arc<dyn QueueClient>, shutdown: ShutdownToken) -> Self {
        Self {
            queue,
            client,
            shutdown,
        }
    }

    /// Queue the delivery came from
    pub fn queue(&self) -> &QueueDescriptor {
        &self.queue
    }

    pub fn client(&self) -> &Arc<dyn QueueClient> {
        &self.client
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Extend or shrink the lease of the current delivery
    pub async fn change_lease(&self, receipt: &str, duration: Duration) -> Result<(), QueueError> {
        self.client
            .change_lease(&self.queue.endpoint, receipt, duration)
            .await?;
        tracing::debug!(lease = ?duration, "Changed message lease");
        Ok(())
    }

    /// Re-send a (possibly modified) body to the queue it was picked from.
    ///
    /// The original delivery is still deleted on success, so the handler
    /// must return Ok to avoid a duplicate.
    pub async fn return_to_queue(
        &self,
        body: impl Into<String>,
        delay: Duration,
    ) -> Result<String, QueueError> {
        let message_id = self
            .client
            .send(&self.queue.endpoint, OutboundMessage::new(body).with_delay(delay))
            .await?;
        tracing::debug!(delay = ?delay, new_message_id = %message_id, "Returned message to the queue");
        Ok(message_id)
    }
}

/// Payload handler supplied by the embedding application
///
/// Returning `Err` shortens the lease so the queue service redelivers the
/// message (or dead-letters it once its redrive policy is exhausted).
#[async_trait]
pub trait PayloadHandler: Send + Sync {
    /// Attribute names to request on top of the configured ones
    fn expected_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    async fn handle(
        &self,
        delivery: Delivery,
        ctx: HandlerContext,
    ) -> Result<(), PayloadProcessingError>;
}
