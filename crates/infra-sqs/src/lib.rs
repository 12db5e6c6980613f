// Prioritizer Infrastructure - AWS SQS Adapter
// Implements: QueueClient

mod client;
mod convert;

pub use client::{SqsClientConfig, SqsQueueClient};
