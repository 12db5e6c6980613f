// Failure Coordinator - runs one handler invocation and settles the message

use crate::application::scheduler::{spawn_guarded, PanicGuardResult};
use crate::domain::{format_duration, InboundMessage, ProcessingOutcome};
use crate::port::{Delivery, HandlerContext, PayloadHandler, PayloadProcessingError, QueueClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, debug_span, error, Instrument};

/// Turns a handler result into a queue operation
///
/// * success: the delivery is deleted
/// * failure or panic: the lease is set to `failure_lease` so the message
///   becomes visible again (and eventually dead-letters)
pub struct FailureCoordinator {
    client: Arc<dyn QueueClient>,
    failure_lease: Duration,
}

impl FailureCoordinator {
    pub fn new(client: Arc<dyn QueueClient>, failure_lease: Duration) -> Self {
        Self {
            client,
            failure_lease,
        }
    }

    pub fn failure_lease(&self) -> Duration {
        self.failure_lease
    }

    /// Process one message. Never fails: settle errors are logged and the
    /// message is left to its current lease.
    pub async fn process(
        &self,
        message: InboundMessage,
        handler: &Arc<dyn PayloadHandler>,
        ctx: HandlerContext,
    ) -> ProcessingOutcome {
        let span = debug_span!(
            "message",
            message_id = %message.message_id,
            queue = %ctx.queue().endpoint
        );
        self.process_inner(message, handler, ctx).instrument(span).await
    }

    async fn process_inner(
        &self,
        message: InboundMessage,
        handler: &Arc<dyn PayloadHandler>,
        ctx: HandlerContext,
    ) -> ProcessingOutcome {
        debug!("Received message");
        let endpoint = ctx.queue().endpoint.clone();
        let receipt = message.receipt.clone();
        let delivery = Delivery {
            message_id: message.message_id,
            body: message.body,
            receipt: message.receipt,
            queue_rank: ctx.queue().rank,
            attributes: message.attributes,
        };

        let handler = Arc::clone(handler);
        let result = spawn_guarded(
            async move { handler.handle(delivery, ctx).await }.in_current_span(),
        )
        .await;

        let outcome = match result {
            PanicGuardResult::Success(Ok(())) => ProcessingOutcome::Success,
            PanicGuardResult::Success(Err(e)) => {
                error!(error = ?e, "Message handler returned an error");
                ProcessingOutcome::Failure(e.to_string())
            }
            PanicGuardResult::Panicked(panic_msg) => {
                ProcessingOutcome::Failure(PayloadProcessingError::panicked(panic_msg).to_string())
            }
        };

        match &outcome {
            ProcessingOutcome::Success => self.settle_success(&endpoint, &receipt).await,
            ProcessingOutcome::Failure(reason) => {
                self.settle_failure(&endpoint, &receipt, reason).await
            }
        }
        outcome
    }

    async fn settle_success(&self, endpoint: &str, receipt: &str) {
        match self.client.delete(endpoint, receipt).await {
            Ok(()) => debug!("Deleted processed message"),
            Err(e) => error!(
                error = %e,
                "Failed to delete processed message. It will be delivered again once its lease expires"
            ),
        }
    }

    async fn settle_failure(&self, endpoint: &str, receipt: &str, reason: &str) {
        error!(
            reason,
            lease = %format_duration(self.failure_lease),
            "Failed to process message. Shortening its lease"
        );
        if let Err(e) = self
            .client
            .change_lease(endpoint, receipt, self.failure_lease)
            .await
        {
            error!(error = %e, "Failed to shorten lease of a failed message");
        }
    }
}
