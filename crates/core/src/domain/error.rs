// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid queue ARN \"{arn}\": {reason}")]
    InvalidArn { arn: String, reason: String },

    #[error("Invalid duration \"{0}\"")]
    InvalidDuration(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
