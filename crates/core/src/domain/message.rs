// Message Domain Model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Attribute stamped by the message pump with the source queue endpoint
pub const PROVENANCE_ATTRIBUTE: &str = "SourceQueue";

/// Typed message attribute (`String`, `Number`, `Binary` or a custom suffix)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttributeValue {
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
}

impl MessageAttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }
}

/// Attribute mapping carried by a message
pub type Attributes = HashMap<String, MessageAttributeValue>;

/// One delivery of a message from a source queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: String,
    pub body: String,
    /// Single-use handle for delete / lease change of this delivery
    pub receipt: String,
    pub attributes: Attributes,
}

impl InboundMessage {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(MessageAttributeValue::as_str)
    }
}

/// Message to be sent to a queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    pub body: String,
    pub attributes: Attributes,
    pub delay: Duration,
}

impl OutboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Result of a single payload handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success,
    Failure(String),
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Success)
    }
}

/// Copy every attribute except the excluded names
pub fn clone_attributes(attributes: &Attributes, exclusions: &[&str]) -> Attributes {
    attributes
        .iter()
        .filter(|(name, _)| !exclusions.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
