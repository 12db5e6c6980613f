// DLQ Redriver - returns dead-lettered output messages to their source queue

use super::{ForwardRoute, ForwardingHandler};
use crate::application::scheduler::{PriorityScheduler, ShutdownToken};
use crate::domain::{clone_attributes, Attributes, ProcessorConfig, QueueDescriptor, PROVENANCE_ATTRIBUTE};
use crate::error::Result;
use crate::port::{Delivery, PayloadProcessingError, QueueClient};
use std::sync::Arc;
use std::time::Duration;

/// Routes a message back to the queue named by its provenance attribute
#[derive(Debug, Clone)]
pub struct ProvenanceRoute {
    delay: Duration,
}

impl ProvenanceRoute {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ForwardRoute for ProvenanceRoute {
    fn destination(
        &self,
        delivery: &Delivery,
        _source: &QueueDescriptor,
    ) -> std::result::Result<String, PayloadProcessingError> {
        delivery
            .attributes
            .get(PROVENANCE_ATTRIBUTE)
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PayloadProcessingError::new(format!(
                    "message has no {PROVENANCE_ATTRIBUTE} attribute, cannot redrive it"
                ))
            })
    }

    /// The provenance is dropped; the next pump pass stamps it again
    fn outbound_attributes(&self, delivery: &Delivery, _source: &QueueDescriptor) -> Attributes {
        clone_attributes(&delivery.attributes, &[PROVENANCE_ATTRIBUTE])
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn expected_attributes(&self) -> Vec<String> {
        vec![PROVENANCE_ATTRIBUTE.to_string()]
    }
}

/// Single-queue scheduler draining the output DLQ
pub struct DlqRedriver {
    scheduler: PriorityScheduler,
}

impl DlqRedriver {
    pub fn new(
        config: Arc<ProcessorConfig>,
        client: Arc<dyn QueueClient>,
        redrive_delay: Duration,
    ) -> Self {
        let handler = Arc::new(ForwardingHandler::new(ProvenanceRoute::new(redrive_delay)));
        Self {
            scheduler: PriorityScheduler::new("redrive", config, client, handler),
        }
    }

    pub fn scheduler(&self) -> &PriorityScheduler {
        &self.scheduler
    }

    pub fn into_scheduler(self) -> PriorityScheduler {
        self.scheduler
    }

    pub async fn run(&self, shutdown: ShutdownToken) -> Result<()> {
        self.scheduler.run(shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::shutdown_channel;
    use crate::domain::{OutputQueueSettings, PrioritySettings};
    use crate::port::queue_client::mocks::{string_attributes, InMemoryQueueClient};

    const SOURCE: &str = "https://sqs.us-east-1.amazonaws.com/1/low";
    const DLQ: &str = "https://sqs.us-east-1.amazonaws.com/1/out-dlq";

    fn redrive_config() -> Arc<ProcessorConfig> {
        let output = OutputQueueSettings {
            output_queue_arn: "arn:aws:sqs:us-east-1:1:out".to_string(),
            redrive_dlq_arn: Some("arn:aws:sqs:us-east-1:1:out-dlq".to_string()),
            ..Default::default()
        };
        let source = PrioritySettings {
            queue_arns: "arn:aws:sqs:us-east-1:1:high,arn:aws:sqs:us-east-1:1:low".to_string(),
            ..Default::default()
        };
        Arc::new(
            output
                .redrive_settings(&source)
                .unwrap()
                .unwrap()
                .into_config()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_redrive_returns_message_to_source_without_provenance() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.push_with_attributes(
            DLQ,
            "payload",
            string_attributes(&[(PROVENANCE_ATTRIBUTE, SOURCE), ("tenant", "acme")]),
        );
        let (tx, token) = shutdown_channel();
        client.halt_after_polls(1, tx);

        let redriver = DlqRedriver::new(redrive_config(), client.clone(), Duration::from_secs(30));
        assert!(redriver
            .scheduler()
            .attribute_names()
            .contains(&PROVENANCE_ATTRIBUTE.to_string()));
        redriver.run(token).await.unwrap();

        let polls = client.polls();
        assert_eq!(polls, vec![(DLQ.to_string(), Duration::from_secs(20))]);

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, SOURCE);
        assert_eq!(sends[0].1.delay, Duration::from_secs(30));
        assert!(!sends[0].1.attributes.contains_key(PROVENANCE_ATTRIBUTE));
        assert_eq!(sends[0].1.attributes["tenant"].as_str(), Some("acme"));
        assert_eq!(client.deletes().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_provenance_fails_with_zero_lease() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.push(DLQ, "orphan");
        let (tx, token) = shutdown_channel();
        client.halt_after_polls(1, tx);

        let redriver = DlqRedriver::new(redrive_config(), client.clone(), Duration::ZERO);
        redriver.run(token).await.unwrap();

        assert!(client.sends().is_empty());
        assert!(client.deletes().is_empty());
        let changes = client.lease_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].2, Duration::ZERO);
    }
}
