// Port Layer - Interfaces for external dependencies

pub mod pause;
pub mod payload_handler;
pub mod queue_client;

// Re-exports
pub use pause::{PauseListener, PauseSource};
pub use payload_handler::{Delivery, HandlerContext, PayloadHandler, PayloadProcessingError};
pub use queue_client::{QueueClient, QueueError};
