//! Restart loop around one scheduler instance

use prioritizer_core::application::scheduler::constants::ERROR_RECOVERY_SLEEP_DURATION;
use prioritizer_core::application::{PriorityScheduler, ShutdownToken};
use tracing::{error, info};

/// Run `scheduler` until shutdown, restarting it after every error
pub async fn supervise(scheduler: PriorityScheduler, mut shutdown: ShutdownToken) {
    loop {
        match scheduler.run(shutdown.clone()).await {
            Ok(()) => break,
            Err(e) => {
                error!(
                    processor_id = %scheduler.listener_id(),
                    error = %e,
                    "Processor stopped with an error"
                );
                if shutdown.sleep(ERROR_RECOVERY_SLEEP_DURATION).await {
                    break;
                }
                info!(processor_id = %scheduler.listener_id(), "Restarting processor");
            }
        }
    }
    info!(processor_id = %scheduler.listener_id(), "Processor exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prioritizer_core::application::shutdown_channel;
    use prioritizer_core::domain::PrioritySettings;
    use prioritizer_core::port::queue_client::mocks::InMemoryQueueClient;
    use prioritizer_core::port::{Delivery, HandlerContext, PayloadHandler, PayloadProcessingError};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoopHandler;

    #[async_trait]
    impl PayloadHandler for NoopHandler {
        async fn handle(
            &self,
            _delivery: Delivery,
            _ctx: HandlerContext,
        ) -> Result<(), PayloadProcessingError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_instance_is_restarted_until_shutdown() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.fail_receives_from("https://sqs.us-east-1.amazonaws.com/1/only");
        let (tx, token) = shutdown_channel();
        client.halt_after_polls(2, tx);

        let config = PrioritySettings {
            queue_arns: "arn:aws:sqs:us-east-1:1:only".to_string(),
            ..Default::default()
        }
        .into_config()
        .unwrap();
        let scheduler = PriorityScheduler::new("p-0", Arc::new(config), client.clone(), Arc::new(NoopHandler));

        tokio::time::timeout(Duration::from_secs(5), supervise(scheduler, token))
            .await
            .unwrap();
        assert_eq!(client.polls().len(), 2);
    }
}
