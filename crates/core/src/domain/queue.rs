// Queue Domain Model

use super::error::{DomainError, Result};
use std::fmt;

/// Parsed SQS queue ARN (`arn:<partition>:sqs:<region>:<account>:<name>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueArn {
    raw: String,
    partition: String,
    region: String,
    account_id: String,
    name: String,
}

impl QueueArn {
    pub fn parse(arn: &str) -> Result<Self> {
        let arn = arn.trim();
        let invalid = |reason: &str| DomainError::InvalidArn {
            arn: arn.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(invalid("expected arn:<partition>:sqs:<region>:<account>:<name>"));
        }
        if parts[2] != "sqs" {
            return Err(invalid("not an SQS resource"));
        }
        if parts[1].is_empty() || parts[3].is_empty() || parts[4].is_empty() {
            return Err(invalid("partition, region and account must be present"));
        }
        if parts[5].is_empty() || parts[5].contains(':') {
            return Err(invalid("queue name is missing or malformed"));
        }

        Ok(Self {
            raw: arn.to_string(),
            partition: parts[1].to_string(),
            region: parts[3].to_string(),
            account_id: parts[4].to_string(),
            name: parts[5].to_string(),
        })
    }

    /// Parse a comma-delimited ARN list, skipping blank entries
    pub fn parse_list(arns: &str) -> Result<Vec<Self>> {
        arns.split(',')
            .map(str::trim)
            .filter(|arn| !arn.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Queue URL derived from the ARN
    ///
    /// `arn:aws:sqs:us-east-2:123456789012:1st-one` becomes
    /// `https://sqs.us-east-2.amazonaws.com/123456789012/1st-one`
    pub fn to_url(&self) -> String {
        format!(
            "https://sqs.{}.amazonaws.com/{}/{}",
            self.region, self.account_id, self.name
        )
    }
}

impl fmt::Display for QueueArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One priority-ranked source queue. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    pub arn: QueueArn,
    pub endpoint: String,
    pub region: String,
    /// Position in the priority list, 0 = highest
    pub rank: usize,
}

impl QueueDescriptor {
    pub fn new(arn: QueueArn, rank: usize) -> Self {
        Self {
            endpoint: arn.to_url(),
            region: arn.region().to_string(),
            arn,
            rank,
        }
    }

    /// Build descriptors in priority order from parsed ARNs
    pub fn ranked(arns: Vec<QueueArn>) -> Vec<Self> {
        arns.into_iter()
            .enumerate()
            .map(|(rank, arn)| Self::new(arn, rank))
            .collect()
    }
}
