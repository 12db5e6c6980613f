// Message Pump - moves prioritized messages into one output queue
//
// The pump is a PayloadHandler: the schedulers deliver messages in priority
// order and the handler re-sends each one to its destination. A message is
// only deleted from its source queue after the send succeeded.

mod redrive;

pub use redrive::{DlqRedriver, ProvenanceRoute};

use crate::application::backpressure::{BackpressureMonitor, PumpState};
use crate::application::scheduler::PriorityScheduler;
use crate::domain::{
    clone_attributes, Attributes, MessageAttributeValue, OutboundMessage, ProcessorConfig,
    QueueDescriptor, PROVENANCE_ATTRIBUTE,
};
use crate::port::{
    Delivery, HandlerContext, PauseListener, PauseSource, PayloadHandler, PayloadProcessingError,
    QueueClient,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Where a forwarded message goes and what it carries
pub trait ForwardRoute: Send + Sync {
    fn destination(
        &self,
        delivery: &Delivery,
        source: &QueueDescriptor,
    ) -> Result<String, PayloadProcessingError>;

    fn outbound_attributes(&self, delivery: &Delivery, source: &QueueDescriptor) -> Attributes;

    /// Visibility delay of the forwarded copy
    fn delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Attributes the route needs on every received message
    fn expected_attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Re-sends every delivery along a [`ForwardRoute`]
pub struct ForwardingHandler<R> {
    route: R,
}

impl<R: ForwardRoute> ForwardingHandler<R> {
    pub fn new(route: R) -> Self {
        Self { route }
    }

    pub fn route(&self) -> &R {
        &self.route
    }
}

#[async_trait]
impl<R: ForwardRoute> PayloadHandler for ForwardingHandler<R> {
    fn expected_attributes(&self) -> Vec<String> {
        self.route.expected_attributes()
    }

    async fn handle(
        &self,
        delivery: Delivery,
        ctx: HandlerContext,
    ) -> Result<(), PayloadProcessingError> {
        let destination = self.route.destination(&delivery, ctx.queue())?;
        let attributes = self.route.outbound_attributes(&delivery, ctx.queue());
        let message = OutboundMessage::new(delivery.body)
            .with_attributes(attributes)
            .with_delay(self.route.delay());

        let new_message_id = ctx.client().send(&destination, message).await?;
        debug!(
            destination = %destination,
            new_message_id = %new_message_id,
            "Forwarded message"
        );
        Ok(())
    }
}

/// Sends everything to the output queue, stamped with the source endpoint
#[derive(Debug, Clone)]
pub struct OutputRoute {
    output_endpoint: String,
}

impl OutputRoute {
    pub fn new(output_endpoint: impl Into<String>) -> Self {
        Self {
            output_endpoint: output_endpoint.into(),
        }
    }
}

impl ForwardRoute for OutputRoute {
    fn destination(
        &self,
        _delivery: &Delivery,
        _source: &QueueDescriptor,
    ) -> Result<String, PayloadProcessingError> {
        Ok(self.output_endpoint.clone())
    }

    fn outbound_attributes(&self, delivery: &Delivery, source: &QueueDescriptor) -> Attributes {
        let mut attributes = clone_attributes(&delivery.attributes, &[PROVENANCE_ATTRIBUTE]);
        attributes.insert(
            PROVENANCE_ATTRIBUTE.to_string(),
            MessageAttributeValue::string(&source.endpoint),
        );
        attributes
    }
}

/// Prioritizing pump from the source queues into the output queue
pub struct MessagePump {
    config: Arc<ProcessorConfig>,
    client: Arc<dyn QueueClient>,
    state: Arc<PumpState>,
    handler: Arc<dyn PayloadHandler>,
}

impl MessagePump {
    /// Subscribe a fresh pump to `monitor` and take one depth sample, so
    /// the pump does not start unpaused in front of a full output queue.
    pub async fn start(
        config: Arc<ProcessorConfig>,
        client: Arc<dyn QueueClient>,
        monitor: &BackpressureMonitor,
    ) -> Self {
        let state = Arc::new(PumpState::new());
        monitor.subscribe(state.clone());
        if monitor.check_depth().await.is_none() && monitor.is_paused() {
            // Monitor was already paused before this pump subscribed
            let _ = state.on_pause_changed(true);
        }

        let handler: Arc<dyn PayloadHandler> = Arc::new(ForwardingHandler::new(OutputRoute::new(
            monitor.output_endpoint(),
        )));
        Self {
            config,
            client,
            state,
            handler,
        }
    }

    pub fn state(&self) -> &Arc<PumpState> {
        &self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn config(&self) -> &Arc<ProcessorConfig> {
        &self.config
    }

    /// Scheduler instance sharing this pump's pause flag
    pub fn scheduler(&self, listener_id: impl Into<String>) -> PriorityScheduler {
        PriorityScheduler::new(
            listener_id,
            Arc::clone(&self.config),
            Arc::clone(&self.client),
            Arc::clone(&self.handler),
        )
        .with_pause_source(self.state.clone())
    }

    /// One scheduler per configured processor
    pub fn schedulers(&self) -> Vec<PriorityScheduler> {
        (0..self.config.processor_count)
            .map(|index| self.scheduler(format!("pump-{index}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::shutdown_channel;
    use crate::domain::{PrioritySettings, QueueArn};
    use crate::port::queue_client::mocks::{string_attributes, InMemoryQueueClient};

    const HIGH: &str = "https://sqs.us-east-1.amazonaws.com/1/high";
    const OUTPUT: &str = "https://sqs.us-east-1.amazonaws.com/1/out";

    fn config() -> Arc<ProcessorConfig> {
        Arc::new(
            PrioritySettings {
                queue_arns: "arn:aws:sqs:us-east-1:1:high,arn:aws:sqs:us-east-1:1:low".to_string(),
                processor_count: 2,
                ..Default::default()
            }
            .into_config()
            .unwrap(),
        )
    }

    fn delivery(attributes: Attributes) -> Delivery {
        Delivery {
            message_id: "m-1".to_string(),
            body: "{\"n\":1}".to_string(),
            receipt: "r-1".to_string(),
            queue_rank: 0,
            attributes,
        }
    }

    #[test]
    fn test_output_route_overwrites_provenance() {
        let source = QueueDescriptor::new(QueueArn::parse("arn:aws:sqs:us-east-1:1:high").unwrap(), 0);
        let route = OutputRoute::new(OUTPUT);
        let delivery = delivery(string_attributes(&[
            ("tenant", "acme"),
            (PROVENANCE_ATTRIBUTE, "https://stale"),
        ]));

        assert_eq!(route.destination(&delivery, &source).unwrap(), OUTPUT);
        let attributes = route.outbound_attributes(&delivery, &source);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes["tenant"].as_str(), Some("acme"));
        assert_eq!(attributes[PROVENANCE_ATTRIBUTE].as_str(), Some(HIGH));
    }

    #[tokio::test]
    async fn test_forwarding_handler_sends_then_scheduler_deletes() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.push_with_attributes(HIGH, "payload", string_attributes(&[("tenant", "acme")]));
        let monitor = BackpressureMonitor::new(client.clone(), OUTPUT, 100, Duration::from_secs(1));
        let pump = MessagePump::start(config(), client.clone(), &monitor).await;
        assert!(!pump.is_paused());

        let (tx, token) = shutdown_channel();
        client.halt_after_polls(1, tx);
        pump.scheduler("pump-0").run(token).await.unwrap();

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, OUTPUT);
        assert_eq!(sends[0].1.body, "payload");
        assert_eq!(sends[0].1.attributes[PROVENANCE_ATTRIBUTE].as_str(), Some(HIGH));
        assert_eq!(client.deletes().len(), 1);
        assert_eq!(client.pending(OUTPUT).len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_message_in_source() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.push(HIGH, "payload");
        client.fail_sends_to(OUTPUT);
        let monitor = BackpressureMonitor::new(client.clone(), OUTPUT, 100, Duration::from_secs(1));
        let pump = MessagePump::start(config(), client.clone(), &monitor).await;

        let (tx, token) = shutdown_channel();
        client.halt_after_polls(1, tx);
        pump.scheduler("pump-0").run(token).await.unwrap();

        assert!(client.deletes().is_empty());
        assert_eq!(client.lease_changes().len(), 1);
    }

    #[tokio::test]
    async fn test_start_samples_depth_before_polling() {
        let client = Arc::new(InMemoryQueueClient::new());
        client.script_depths([Ok(500)]);
        let monitor = BackpressureMonitor::new(client.clone(), OUTPUT, 100, Duration::from_secs(1));
        let pump = MessagePump::start(config(), client.clone(), &monitor).await;

        assert!(pump.is_paused());
        assert_eq!(pump.schedulers().len(), 2);
        assert_eq!(pump.schedulers()[1].listener_id(), "pump-1");
    }
}
