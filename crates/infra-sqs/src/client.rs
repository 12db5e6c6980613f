// SQS QueueClient implementation

use crate::convert::{delay_seconds, inbound_batch, lease_seconds, sdk_attributes, wait_seconds};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use prioritizer_core::domain::{InboundMessage, OutboundMessage};
use prioritizer_core::port::{QueueClient, QueueError};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings of the SQS client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqsClientConfig {
    pub region: String,
    /// Custom endpoint (LocalStack, ElasticMQ)
    pub endpoint_url: Option<String>,
}

/// QueueClient backed by one SQS client. Serves exactly one region.
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    client: Client,
    region: String,
}

impl SqsQueueClient {
    /// Build a client using the default credential chain
    pub async fn connect(config: &SqsClientConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        info!(
            region = %config.region,
            endpoint_url = ?config.endpoint_url,
            "SQS client configured"
        );
        Self::from_client(Client::new(&sdk_config), config.region.clone())
    }

    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

fn error_message<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(
        &self,
        endpoint: &str,
        max_messages: u8,
        wait: Duration,
        attribute_names: &[String],
    ) -> Result<Vec<InboundMessage>, QueueError> {
        let mut request = self
            .client
            .receive_message()
            .queue_url(endpoint)
            .max_number_of_messages(i32::from(max_messages))
            .wait_time_seconds(wait_seconds(wait));
        if !attribute_names.is_empty() {
            request = request.set_message_attribute_names(Some(attribute_names.to_vec()));
        }

        let output = request.send().await.map_err(|e| QueueError::Receive {
            endpoint: endpoint.to_string(),
            message: error_message(e),
        })?;

        Ok(inbound_batch(endpoint, output.messages.unwrap_or_default()))
    }

    async fn delete(&self, endpoint: &str, receipt: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(endpoint)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| QueueError::Delete {
                endpoint: endpoint.to_string(),
                message: error_message(e),
            })?;
        Ok(())
    }

    async fn change_lease(
        &self,
        endpoint: &str,
        receipt: &str,
        duration: Duration,
    ) -> Result<(), QueueError> {
        self.client
            .change_message_visibility()
            .queue_url(endpoint)
            .receipt_handle(receipt)
            .visibility_timeout(lease_seconds(duration))
            .send()
            .await
            .map_err(|e| QueueError::ChangeLease {
                endpoint: endpoint.to_string(),
                message: error_message(e),
            })?;
        Ok(())
    }

    async fn send(&self, endpoint: &str, message: OutboundMessage) -> Result<String, QueueError> {
        let mut request = self
            .client
            .send_message()
            .queue_url(endpoint)
            .message_body(message.body);
        if !message.delay.is_zero() {
            request = request.delay_seconds(delay_seconds(message.delay));
        }
        if !message.attributes.is_empty() {
            request = request.set_message_attributes(Some(sdk_attributes(endpoint, message.attributes)?));
        }

        let output = request.send().await.map_err(|e| QueueError::Send {
            endpoint: endpoint.to_string(),
            message: error_message(e),
        })?;
        let message_id = output
            .message_id()
            .ok_or_else(|| QueueError::MissingField {
                endpoint: endpoint.to_string(),
                field: "MessageId",
            })?
            .to_string();
        debug!(endpoint, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    async fn approximate_depth(&self, endpoint: &str) -> Result<u64, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(endpoint)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| QueueError::Attributes {
                endpoint: endpoint.to_string(),
                message: error_message(e),
            })?;

        let depth = output
            .attributes()
            .and_then(|attributes| attributes.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .ok_or_else(|| QueueError::MissingField {
                endpoint: endpoint.to_string(),
                field: "ApproximateNumberOfMessages",
            })?;
        depth.parse().map_err(|_| QueueError::Attributes {
            endpoint: endpoint.to_string(),
            message: format!("unexpected ApproximateNumberOfMessages value {depth:?}"),
        })
    }
}
