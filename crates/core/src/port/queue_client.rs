// Queue Client Port (Interface)
// Primitive operations of the managed message-queue service

use crate::domain::{InboundMessage, OutboundMessage};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Queue service errors. All of them may be transient.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Receive from {endpoint} failed: {message}")]
    Receive { endpoint: String, message: String },

    #[error("Delete from {endpoint} failed: {message}")]
    Delete { endpoint: String, message: String },

    #[error("Lease change on {endpoint} failed: {message}")]
    ChangeLease { endpoint: String, message: String },

    #[error("Send to {endpoint} failed: {message}")]
    Send { endpoint: String, message: String },

    #[error("Attribute query on {endpoint} failed: {message}")]
    Attributes { endpoint: String, message: String },

    #[error("Response from {endpoint} is missing {field}")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },
}

/// Network client of the queue service
///
/// One client serves exactly one region.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_messages`, blocking server-side for up to `wait`
    async fn receive(
        &self,
        endpoint: &str,
        max_messages: u8,
        wait: Duration,
        attribute_names: &[String],
    ) -> Result<Vec<InboundMessage>, QueueError>;

    /// Delete a delivered message
    async fn delete(&self, endpoint: &str, receipt: &str) -> Result<(), QueueError>;

    /// Change the visibility lease of a delivered message
    async fn change_lease(
        &self,
        endpoint: &str,
        receipt: &str,
        duration: Duration,
    ) -> Result<(), QueueError>;

    /// Send a message, returning the new message id
    async fn send(&self, endpoint: &str, message: OutboundMessage) -> Result<String, QueueError>;

    /// Approximate number of visible messages
    async fn approximate_depth(&self, endpoint: &str) -> Result<u64, QueueError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::application::scheduler::ShutdownSender;
    use crate::domain::{Attributes, MessageAttributeValue};
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    /// Every call issued against the mock, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum QueueCall {
        Receive {
            endpoint: String,
            max_messages: u8,
            wait: Duration,
            attribute_names: Vec<String>,
        },
        Delete {
            endpoint: String,
            receipt: String,
        },
        ChangeLease {
            endpoint: String,
            receipt: String,
            duration: Duration,
        },
        Send {
            endpoint: String,
            message: OutboundMessage,
        },
        Depth {
            endpoint: String,
        },
    }

    #[derive(Default)]
    struct MockState {
        queues: HashMap<String, VecDeque<InboundMessage>>,
        calls: Vec<QueueCall>,
        depths: VecDeque<Result<u64, String>>,
        halt: Option<(usize, ShutdownSender)>,
        failing_receives: HashSet<String>,
        failing_sends: HashSet<String>,
        failing_deletes: HashSet<String>,
        deliveries: u64,
    }

    /// In-memory queue service recording every call
    #[derive(Default)]
    pub struct InMemoryQueueClient {
        state: Mutex<MockState>,
    }

    impl InMemoryQueueClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Enqueue a message body, returning its message id
        pub fn push(&self, endpoint: &str, body: &str) -> String {
            self.push_with_attributes(endpoint, body, Attributes::new())
        }

        pub fn push_with_attributes(
            &self,
            endpoint: &str,
            body: &str,
            attributes: Attributes,
        ) -> String {
            let message_id = uuid::Uuid::new_v4().to_string();
            self.state
                .lock()
                .unwrap()
                .queues
                .entry(endpoint.to_string())
                .or_default()
                .push_back(InboundMessage {
                    message_id: message_id.clone(),
                    body: body.to_string(),
                    receipt: String::new(),
                    attributes,
                });
            message_id
        }

        /// Depth samples returned by `approximate_depth`, in order.
        /// `Err` entries simulate a failed query. Once exhausted, the
        /// current in-memory length is reported.
        pub fn script_depths(&self, depths: impl IntoIterator<Item = Result<u64, String>>) {
            self.state.lock().unwrap().depths.extend(depths);
        }

        /// Signal shutdown right after the `polls`-th receive call
        pub fn halt_after_polls(&self, polls: usize, sender: ShutdownSender) {
            self.state.lock().unwrap().halt = Some((polls, sender));
        }

        pub fn fail_receives_from(&self, endpoint: &str) {
            self.state
                .lock()
                .unwrap()
                .failing_receives
                .insert(endpoint.to_string());
        }

        pub fn fail_sends_to(&self, endpoint: &str) {
            self.state
                .lock()
                .unwrap()
                .failing_sends
                .insert(endpoint.to_string());
        }

        pub fn fail_deletes_from(&self, endpoint: &str) {
            self.state
                .lock()
                .unwrap()
                .failing_deletes
                .insert(endpoint.to_string());
        }

        pub fn calls(&self) -> Vec<QueueCall> {
            self.state.lock().unwrap().calls.clone()
        }

        /// (endpoint, wait) of every receive call
        pub fn polls(&self) -> Vec<(String, Duration)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    QueueCall::Receive { endpoint, wait, .. } => Some((endpoint, wait)),
                    _ => None,
                })
                .collect()
        }

        /// (endpoint, receipt) of every delete call
        pub fn deletes(&self) -> Vec<(String, String)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    QueueCall::Delete { endpoint, receipt } => Some((endpoint, receipt)),
                    _ => None,
                })
                .collect()
        }

        /// (endpoint, receipt, duration) of every lease change call
        pub fn lease_changes(&self) -> Vec<(String, String, Duration)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    QueueCall::ChangeLease {
                        endpoint,
                        receipt,
                        duration,
                    } => Some((endpoint, receipt, duration)),
                    _ => None,
                })
                .collect()
        }

        /// (endpoint, message) of every send call
        pub fn sends(&self) -> Vec<(String, OutboundMessage)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    QueueCall::Send { endpoint, message } => Some((endpoint, message)),
                    _ => None,
                })
                .collect()
        }

        /// Messages still waiting in a queue
        pub fn pending(&self, endpoint: &str) -> Vec<InboundMessage> {
            self.state
                .lock()
                .unwrap()
                .queues
                .get(endpoint)
                .map(|queue| queue.iter().cloned().collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueueClient for InMemoryQueueClient {
        async fn receive(
            &self,
            endpoint: &str,
            max_messages: u8,
            wait: Duration,
            attribute_names: &[String],
        ) -> Result<Vec<InboundMessage>, QueueError> {
            // A real receive always suspends; keep peer tasks running
            tokio::task::yield_now().await;

            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Receive {
                endpoint: endpoint.to_string(),
                max_messages,
                wait,
                attribute_names: attribute_names.to_vec(),
            });

            let polls = state
                .calls
                .iter()
                .filter(|call| matches!(call, QueueCall::Receive { .. }))
                .count();
            if let Some((limit, sender)) = &state.halt {
                if polls >= *limit {
                    sender.shutdown();
                }
            }

            if state.failing_receives.contains(endpoint) {
                return Err(QueueError::Receive {
                    endpoint: endpoint.to_string(),
                    message: "simulated receive failure".to_string(),
                });
            }

            let mut batch = Vec::new();
            while batch.len() < max_messages as usize {
                let Some(mut message) = state
                    .queues
                    .get_mut(endpoint)
                    .and_then(|queue| queue.pop_front())
                else {
                    break;
                };
                state.deliveries += 1;
                message.receipt = format!("{}-receipt-{}", message.message_id, state.deliveries);
                batch.push(message);
            }
            Ok(batch)
        }

        async fn delete(&self, endpoint: &str, receipt: &str) -> Result<(), QueueError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Delete {
                endpoint: endpoint.to_string(),
                receipt: receipt.to_string(),
            });
            if state.failing_deletes.contains(endpoint) {
                return Err(QueueError::Delete {
                    endpoint: endpoint.to_string(),
                    message: "simulated delete failure".to_string(),
                });
            }
            Ok(())
        }

        async fn change_lease(
            &self,
            endpoint: &str,
            receipt: &str,
            duration: Duration,
        ) -> Result<(), QueueError> {
            self.state.lock().unwrap().calls.push(QueueCall::ChangeLease {
                endpoint: endpoint.to_string(),
                receipt: receipt.to_string(),
                duration,
            });
            Ok(())
        }

        async fn send(&self, endpoint: &str, message: OutboundMessage) -> Result<String, QueueError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Send {
                endpoint: endpoint.to_string(),
                message: message.clone(),
            });
            if state.failing_sends.contains(endpoint) {
                return Err(QueueError::Send {
                    endpoint: endpoint.to_string(),
                    message: "simulated send failure".to_string(),
                });
            }

            let message_id = uuid::Uuid::new_v4().to_string();
            state
                .queues
                .entry(endpoint.to_string())
                .or_default()
                .push_back(InboundMessage {
                    message_id: message_id.clone(),
                    body: message.body,
                    receipt: String::new(),
                    attributes: message.attributes,
                });
            Ok(message_id)
        }

        async fn approximate_depth(&self, endpoint: &str) -> Result<u64, QueueError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(QueueCall::Depth {
                endpoint: endpoint.to_string(),
            });
            match state.depths.pop_front() {
                Some(Ok(depth)) => Ok(depth),
                Some(Err(message)) => Err(QueueError::Attributes {
                    endpoint: endpoint.to_string(),
                    message,
                }),
                None => Ok(state.queues.get(endpoint).map_or(0, |q| q.len() as u64)),
            }
        }
    }

    /// Attribute map from string pairs
    pub fn string_attributes(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), MessageAttributeValue::string(*value)))
            .collect()
    }
}
