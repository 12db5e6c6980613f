// Application Layer - Scheduling, dispatch and the message pump

pub mod backpressure;
pub mod dispatcher;
pub mod failure;
pub mod json_handler;
pub mod pump;
pub mod scheduler;

// Re-exports
pub use backpressure::{BackpressureMonitor, PumpState};
pub use dispatcher::MessageDispatcher;
pub use failure::FailureCoordinator;
pub use json_handler::{JsonHandler, TypedHandler};
pub use pump::{DlqRedriver, ForwardRoute, ForwardingHandler, MessagePump, OutputRoute, ProvenanceRoute};
pub use scheduler::{
    shutdown_channel, PriorityScheduler, ShutdownSender, ShutdownToken, SweepPlanner,
};
