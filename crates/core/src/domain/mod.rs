// Domain Layer - Queue identity, messages and settings

pub mod config;
pub mod duration;
pub mod error;
pub mod message;
pub mod queue;

// Re-exports
pub use config::{OutputQueueSettings, PrioritySettings, ProcessorConfig};
pub use duration::{format_duration, parse_duration};
pub use error::DomainError;
pub use message::{
    clone_attributes, Attributes, InboundMessage, MessageAttributeValue, OutboundMessage,
    ProcessingOutcome, PROVENANCE_ATTRIBUTE,
};
pub use queue::{QueueArn, QueueDescriptor};
