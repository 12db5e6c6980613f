//! Command line and environment settings

use clap::Parser;
use prioritizer_core::domain::{parse_duration, OutputQueueSettings, PrioritySettings};
use std::time::Duration;

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

/// Prioritizing pump from ranked SQS queues into one output queue
#[derive(Parser, Debug, Clone)]
#[command(name = "queue-prioritizer", version, about)]
pub struct Args {
    /// Comma-delimited source queue ARNs, highest priority first
    #[arg(long, env = "PRIORITIZER_QUEUE_ARNS")]
    pub queue_arns: String,

    /// Parallel scheduler instances sweeping the source queues
    #[arg(long, env = "PRIORITIZER_PROCESSOR_COUNT", default_value_t = 3)]
    pub processor_count: usize,

    /// Messages requested per receive (1-10)
    #[arg(long, env = "PRIORITIZER_BATCH_SIZE", default_value_t = 1)]
    pub batch_size: u8,

    /// Long-poll wait of the top queue, e.g. "3s"
    #[arg(long, env = "PRIORITIZER_HIGH_PRIORITY_WAIT", default_value = "3s", value_parser = duration_arg)]
    pub high_priority_wait: Duration,

    /// Lease applied to a message whose processing failed
    #[arg(long, env = "PRIORITIZER_FAILURE_LEASE", default_value = "1s", value_parser = duration_arg)]
    pub failure_lease: Duration,

    /// Comma-delimited message attribute names to receive
    #[arg(long, env = "PRIORITIZER_EXPECTED_ATTRIBUTES", default_value = "")]
    pub expected_attributes: String,

    #[arg(long, env = "PRIORITIZER_PAUSE_CHECK_INTERVAL", default_value = "0.25s", value_parser = duration_arg)]
    pub pause_check_interval: Duration,

    /// Output queue ARN fed by the pump
    #[arg(long, env = "PRIORITIZER_OUTPUT_QUEUE_ARN")]
    pub output_queue_arn: String,

    /// Output queue depth at which the pump pauses
    #[arg(long, env = "PRIORITIZER_THROTTLE_DEPTH", default_value_t = 100)]
    pub throttle_depth: u64,

    #[arg(long, env = "PRIORITIZER_DEPTH_CHECK_INTERVAL", default_value = "1s", value_parser = duration_arg)]
    pub depth_check_interval: Duration,

    /// DLQ of the output queue to redrive back into the source queues
    #[arg(long, env = "PRIORITIZER_REDRIVE_DLQ_ARN")]
    pub redrive_dlq_arn: Option<String>,

    /// Delay of every redriven message
    #[arg(long, env = "PRIORITIZER_REDRIVE_DELAY", default_value = "0s", value_parser = duration_arg)]
    pub redrive_delay: Duration,

    /// Run a test consumer of the output queue failing every Nth message
    #[arg(long, env = "PRIORITIZER_FAIL_EVERY")]
    pub fail_every: Option<u32>,

    /// Custom SQS endpoint (LocalStack, ElasticMQ)
    #[arg(long, env = "PRIORITIZER_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

impl Args {
    pub fn priority_settings(&self) -> PrioritySettings {
        PrioritySettings {
            queue_arns: self.queue_arns.clone(),
            processor_count: self.processor_count,
            batch_size: self.batch_size,
            high_priority_wait: self.high_priority_wait,
            failure_lease: self.failure_lease,
            expected_attributes: self.expected_attributes.clone(),
            pause_check_interval: self.pause_check_interval,
        }
    }

    pub fn output_settings(&self) -> OutputQueueSettings {
        OutputQueueSettings {
            output_queue_arn: self.output_queue_arn.clone(),
            throttle_depth: self.throttle_depth,
            depth_check_interval: self.depth_check_interval,
            redrive_dlq_arn: self.redrive_dlq_arn.clone(),
            redrive_delay: self.redrive_delay,
            fail_every: self.fail_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [&str; 5] = [
        "queue-prioritizer",
        "--queue-arns",
        "arn:aws:sqs:us-east-1:1:high,arn:aws:sqs:us-east-1:1:low",
        "--output-queue-arn",
        "arn:aws:sqs:us-east-1:1:out",
    ];

    #[test]
    fn test_defaults_match_settings_defaults() {
        let args = Args::try_parse_from(BASE).unwrap();
        let priority = args.priority_settings();
        let defaults = PrioritySettings::default();

        assert_eq!(priority.processor_count, defaults.processor_count);
        assert_eq!(priority.batch_size, defaults.batch_size);
        assert_eq!(priority.high_priority_wait, defaults.high_priority_wait);
        assert_eq!(priority.failure_lease, defaults.failure_lease);
        assert_eq!(priority.pause_check_interval, defaults.pause_check_interval);

        let output = args.output_settings();
        assert_eq!(output.throttle_depth, 100);
        assert_eq!(output.redrive_dlq_arn, None);
        assert_eq!(output.fail_every, None);
    }

    #[test]
    fn test_durations_use_compact_notation() {
        let mut argv = BASE.to_vec();
        argv.extend(["--failure-lease", "1m30s", "--redrive-delay", "2m"]);
        let args = Args::try_parse_from(argv).unwrap();

        assert_eq!(args.failure_lease, Duration::from_secs(90));
        assert_eq!(args.redrive_delay, Duration::from_secs(120));
    }

    #[test]
    fn test_malformed_duration_rejected() {
        let mut argv = BASE.to_vec();
        argv.extend(["--high-priority-wait", "3x"]);
        assert!(Args::try_parse_from(argv).is_err());
    }
}
