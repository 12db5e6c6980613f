// Conversions between SDK types and the core message model

use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{Message, MessageAttributeValue as SdkAttributeValue};
use prioritizer_core::domain::config::{MAX_LEASE_DURATION, MAX_LONG_POLL_WAIT, MAX_SEND_DELAY};
use prioritizer_core::domain::{Attributes, InboundMessage, MessageAttributeValue};
use prioritizer_core::port::QueueError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Whole seconds for a receive wait, capped at the service maximum
pub(crate) fn wait_seconds(wait: Duration) -> i32 {
    capped_seconds(wait, MAX_LONG_POLL_WAIT)
}

/// Whole seconds for a visibility timeout, capped at the service maximum
pub(crate) fn lease_seconds(lease: Duration) -> i32 {
    capped_seconds(lease, MAX_LEASE_DURATION)
}

/// Whole seconds for a send delay, capped at the service maximum
pub(crate) fn delay_seconds(delay: Duration) -> i32 {
    capped_seconds(delay, MAX_SEND_DELAY)
}

fn capped_seconds(duration: Duration, max: Duration) -> i32 {
    // All service maxima fit comfortably in i32
    i32::try_from(duration.min(max).as_secs()).unwrap_or(i32::MAX)
}

pub(crate) fn inbound_message(endpoint: &str, message: Message) -> Result<InboundMessage, QueueError> {
    let missing = |field| QueueError::MissingField {
        endpoint: endpoint.to_string(),
        field,
    };

    let message_id = message.message_id().ok_or_else(|| missing("MessageId"))?.to_string();
    let receipt = message
        .receipt_handle()
        .ok_or_else(|| missing("ReceiptHandle"))?
        .to_string();
    let attributes = message
        .message_attributes()
        .map(domain_attributes)
        .unwrap_or_default();

    Ok(InboundMessage {
        message_id,
        body: message.body().unwrap_or_default().to_string(),
        receipt,
        attributes,
    })
}

/// Convert a received batch. An entry the service returned without an id or
/// receipt cannot be settled, so it is logged and skipped; the rest of the
/// batch is still delivered.
pub(crate) fn inbound_batch(endpoint: &str, messages: Vec<Message>) -> Vec<InboundMessage> {
    messages
        .into_iter()
        .filter_map(|message| match inbound_message(endpoint, message) {
            Ok(inbound) => Some(inbound),
            Err(e) => {
                warn!(endpoint, error = %e, "Skipping malformed message");
                None
            }
        })
        .collect()
}

fn domain_attributes(attributes: &HashMap<String, SdkAttributeValue>) -> Attributes {
    attributes
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                MessageAttributeValue {
                    data_type: value.data_type().to_string(),
                    string_value: value.string_value().map(str::to_string),
                    binary_value: value.binary_value().map(|blob| blob.as_ref().to_vec()),
                },
            )
        })
        .collect()
}

pub(crate) fn sdk_attributes(
    endpoint: &str,
    attributes: Attributes,
) -> Result<HashMap<String, SdkAttributeValue>, QueueError> {
    attributes
        .into_iter()
        .map(|(name, value)| {
            let sdk_value = SdkAttributeValue::builder()
                .data_type(value.data_type)
                .set_string_value(value.string_value)
                .set_binary_value(value.binary_value.map(Blob::new))
                .build()
                .map_err(|e| QueueError::Send {
                    endpoint: endpoint.to_string(),
                    message: format!("invalid attribute {name}: {e}"),
                })?;
            Ok((name, sdk_value))
        })
        .collect()
}
