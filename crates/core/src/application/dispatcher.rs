// Message Dispatcher - fans one received batch out to the payload handler

use crate::application::failure::FailureCoordinator;
use crate::application::scheduler::ShutdownToken;
use crate::domain::{InboundMessage, QueueDescriptor};
use crate::port::{HandlerContext, PayloadHandler, QueueClient};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct MessageDispatcher {
    client: Arc<dyn QueueClient>,
    handler: Arc<dyn PayloadHandler>,
    coordinator: FailureCoordinator,
}

impl MessageDispatcher {
    pub fn new(
        client: Arc<dyn QueueClient>,
        handler: Arc<dyn PayloadHandler>,
        failure_lease: Duration,
    ) -> Self {
        Self {
            coordinator: FailureCoordinator::new(Arc::clone(&client), failure_lease),
            client,
            handler,
        }
    }

    pub fn handler(&self) -> &Arc<dyn PayloadHandler> {
        &self.handler
    }

    /// Process every message of the batch concurrently and wait for all of them.
    ///
    /// Returns true if the batch held any message, whatever the outcomes.
    pub async fn dispatch(
        &self,
        queue: &QueueDescriptor,
        messages: Vec<InboundMessage>,
        shutdown: ShutdownToken,
    ) -> bool {
        if messages.is_empty() {
            return false;
        }

        let ctx = HandlerContext::new(queue.clone(), Arc::clone(&self.client), shutdown);
        let outcomes = join_all(
            messages
                .into_iter()
                .map(|message| self.coordinator.process(message, &self.handler, ctx.clone())),
        )
        .await;

        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        debug!(
            queue_rank = queue.rank,
            processed = outcomes.len(),
            failed,
            "Batch processed"
        );
        true
    }
}
