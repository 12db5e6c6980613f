// Processor and output queue settings

use super::error::{DomainError, Result};
use super::message::PROVENANCE_ATTRIBUTE;
use super::queue::{QueueArn, QueueDescriptor};
use std::time::Duration;

/// Largest receive batch the queue service accepts
pub const MAX_BATCH_SIZE: u8 = 10;

/// Longest server-side long poll the queue service accepts
pub const MAX_LONG_POLL_WAIT: Duration = Duration::from_secs(20);

/// Longest visibility timeout the queue service accepts (12 hours)
pub const MAX_LEASE_DURATION: Duration = Duration::from_secs(12 * 3600);

/// Longest per-message send delay the queue service accepts (15 minutes)
pub const MAX_SEND_DELAY: Duration = Duration::from_secs(15 * 60);

/// Raw processor settings as supplied by the embedding application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrioritySettings {
    /// Comma-delimited queue ARNs, highest priority first
    pub queue_arns: String,
    /// Number of parallel scheduler instances, each sweeping all queues
    pub processor_count: usize,
    pub batch_size: u8,
    /// Long-poll wait of the top queue. Ignored with a single queue.
    pub high_priority_wait: Duration,
    /// Visibility timeout applied to a message whose processing failed
    pub failure_lease: Duration,
    /// Comma-delimited attribute names to request on receive
    pub expected_attributes: String,
    pub pause_check_interval: Duration,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            queue_arns: String::new(),
            processor_count: 3,
            batch_size: 1,
            high_priority_wait: Duration::from_secs(3),
            failure_lease: Duration::from_secs(1),
            expected_attributes: String::new(),
            pause_check_interval: Duration::from_millis(250),
        }
    }
}

impl PrioritySettings {
    pub fn expected_attribute_names(&self) -> Vec<String> {
        split_list(&self.expected_attributes)
    }

    /// Validate and resolve into an immutable [`ProcessorConfig`]
    pub fn into_config(self) -> Result<ProcessorConfig> {
        let arns = QueueArn::parse_list(&self.queue_arns)?;
        if arns.is_empty() {
            return Err(DomainError::ValidationError(
                "queue ARN list cannot be empty".to_string(),
            ));
        }

        let region = arns[0].region().to_string();
        if let Some(other) = arns.iter().find(|arn| arn.region() != region) {
            return Err(DomainError::ValidationError(format!(
                "all queues must be in one region: {} is in {}, expected {}",
                other,
                other.region(),
                region
            )));
        }

        if self.processor_count == 0 {
            return Err(DomainError::ValidationError(
                "processor count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(DomainError::ValidationError(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.high_priority_wait > MAX_LONG_POLL_WAIT {
            return Err(DomainError::ValidationError(format!(
                "high priority wait cannot exceed {}s",
                MAX_LONG_POLL_WAIT.as_secs()
            )));
        }
        if self.failure_lease > MAX_LEASE_DURATION {
            return Err(DomainError::ValidationError(
                "failure lease cannot exceed 12h".to_string(),
            ));
        }
        if self.pause_check_interval.is_zero() {
            return Err(DomainError::ValidationError(
                "pause check interval must be positive".to_string(),
            ));
        }

        Ok(ProcessorConfig {
            expected_attributes: self.expected_attribute_names(),
            queues: QueueDescriptor::ranked(arns),
            region,
            processor_count: self.processor_count,
            batch_size: self.batch_size,
            high_priority_wait: self.high_priority_wait,
            failure_lease: self.failure_lease,
            pause_check_interval: self.pause_check_interval,
        })
    }
}

/// Validated processor configuration, shared read-only by every instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub queues: Vec<QueueDescriptor>,
    pub region: String,
    pub processor_count: usize,
    pub batch_size: u8,
    pub high_priority_wait: Duration,
    pub failure_lease: Duration,
    pub expected_attributes: Vec<String>,
    pub pause_check_interval: Duration,
}

/// Settings of the single output queue fed by the message pump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputQueueSettings {
    pub output_queue_arn: String,
    /// Pump pauses once the output queue holds this many messages
    pub throttle_depth: u64,
    pub depth_check_interval: Duration,
    /// DLQ of the output queue, redriven back into the source queues
    pub redrive_dlq_arn: Option<String>,
    /// Static visibility delay of every redriven message
    pub redrive_delay: Duration,
    /// Test consumer of the output queue failing every Nth message.
    /// None disables it, 0 succeeds everything, 1 fails everything.
    pub fail_every: Option<u32>,
}

impl Default for OutputQueueSettings {
    fn default() -> Self {
        Self {
            output_queue_arn: String::new(),
            throttle_depth: 100,
            depth_check_interval: Duration::from_secs(1),
            redrive_dlq_arn: None,
            redrive_delay: Duration::ZERO,
            fail_every: None,
        }
    }
}

impl OutputQueueSettings {
    pub fn output_queue(&self) -> Result<QueueArn> {
        QueueArn::parse(&self.output_queue_arn)
    }

    pub fn redrive_dlq(&self) -> Result<Option<QueueArn>> {
        self.redrive_dlq_arn
            .as_deref()
            .map(str::trim)
            .filter(|arn| !arn.is_empty())
            .map(QueueArn::parse)
            .transpose()
    }

    /// Validate against the region served by the queue client
    pub fn validate(&self, region: &str) -> Result<()> {
        let output = self.output_queue()?;
        let mut arns = vec![output];
        arns.extend(self.redrive_dlq()?);
        if let Some(other) = arns.iter().find(|arn| arn.region() != region) {
            return Err(DomainError::ValidationError(format!(
                "{} is in {}, expected {}",
                other,
                other.region(),
                region
            )));
        }

        if self.throttle_depth == 0 {
            return Err(DomainError::ValidationError(
                "throttle depth must be positive".to_string(),
            ));
        }
        if self.depth_check_interval.is_zero() {
            return Err(DomainError::ValidationError(
                "depth check interval must be positive".to_string(),
            ));
        }
        if self.redrive_delay > MAX_SEND_DELAY {
            return Err(DomainError::ValidationError(
                "redrive delay cannot exceed 15m".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for draining the output DLQ, if one is configured
    pub fn redrive_settings(&self, source: &PrioritySettings) -> Result<Option<PrioritySettings>> {
        Ok(self
            .redrive_dlq()?
            .map(|dlq| single_queue_settings(dlq.to_string(), source)))
    }

    /// Settings for the synthetic test consumer of the output queue
    pub fn output_consumer_settings(&self, source: &PrioritySettings) -> Option<PrioritySettings> {
        self.fail_every
            .map(|_| single_queue_settings(self.output_queue_arn.clone(), source))
    }
}

fn single_queue_settings(queue_arn: String, source: &PrioritySettings) -> PrioritySettings {
    let mut attributes = source.expected_attribute_names();
    if !attributes.iter().any(|name| name == PROVENANCE_ATTRIBUTE) {
        attributes.push(PROVENANCE_ATTRIBUTE.to_string());
    }

    PrioritySettings {
        queue_arns: queue_arn,
        processor_count: 1,
        batch_size: MAX_BATCH_SIZE,
        high_priority_wait: MAX_LONG_POLL_WAIT,
        failure_lease: Duration::ZERO,
        expected_attributes: attributes.join(","),
        pause_check_interval: source.pause_check_interval,
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
