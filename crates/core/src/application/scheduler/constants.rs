// Scheduler constants (No magic values)
use std::time::Duration;

pub use crate::domain::config::{MAX_BATCH_SIZE, MAX_LONG_POLL_WAIT};

/// Sleep duration after a failed instance before it is restarted (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Graceful shutdown timeout (25s)
/// Must exceed MAX_LONG_POLL_WAIT so in-flight polls can return
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(25);
