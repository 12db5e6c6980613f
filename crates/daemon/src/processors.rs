//! Test consumer of the output queue

use async_trait::async_trait;
use prioritizer_core::port::{Delivery, HandlerContext, PayloadHandler, PayloadProcessingError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Consumes output messages and fails every Nth one, so the redrive path
/// can be exercised end to end. 0 never fails, 1 fails everything.
pub struct SyntheticFailureHandler {
    fail_every: u32,
    processed: AtomicU64,
}

impl SyntheticFailureHandler {
    pub fn new(fail_every: u32) -> Self {
        Self {
            fail_every,
            processed: AtomicU64::new(0),
        }
    }

    fn should_fail(&self) -> bool {
        let count = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        self.fail_every != 0 && count % u64::from(self.fail_every) == 0
    }
}

#[async_trait]
impl PayloadHandler for SyntheticFailureHandler {
    async fn handle(
        &self,
        delivery: Delivery,
        _ctx: HandlerContext,
    ) -> Result<(), PayloadProcessingError> {
        if self.should_fail() {
            return Err(PayloadProcessingError::new(format!(
                "synthetic failure of message {}",
                delivery.message_id
            )));
        }
        info!(message_id = %delivery.message_id, body = %delivery.body, "Consumed output message");
        Ok(())
    }
}
