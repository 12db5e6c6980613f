// Priority Scheduler - sweep loop over the ranked source queues

pub mod constants;
mod panic_guard;
mod plan;
mod shutdown;

pub use panic_guard::{execute_guarded, spawn_guarded, PanicGuardResult};
pub use plan::{PollRequest, SweepPlanner, SweepState};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::dispatcher::MessageDispatcher;
use crate::domain::{format_duration, ProcessorConfig};
use crate::error::Result;
use crate::port::{PauseSource, PayloadHandler, QueueClient};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, trace, Instrument};

/// One scheduler instance. N instances share a config and sweep the same
/// queues independently; the queue service hands each message to one of them.
pub struct PriorityScheduler {
    listener_id: String,
    config: Arc<ProcessorConfig>,
    client: Arc<dyn QueueClient>,
    dispatcher: MessageDispatcher,
    pause: Option<Arc<dyn PauseSource>>,
    attribute_names: Vec<String>,
}

impl PriorityScheduler {
    pub fn new(
        listener_id: impl Into<String>,
        config: Arc<ProcessorConfig>,
        client: Arc<dyn QueueClient>,
        handler: Arc<dyn PayloadHandler>,
    ) -> Self {
        let mut attribute_names = config.expected_attributes.clone();
        for name in handler.expected_attributes() {
            if !attribute_names.contains(&name) {
                attribute_names.push(name);
            }
        }

        let dispatcher =
            MessageDispatcher::new(Arc::clone(&client), handler, config.failure_lease);
        Self {
            listener_id: listener_id.into(),
            config,
            client,
            dispatcher,
            pause: None,
            attribute_names,
        }
    }

    /// Skip polling while `pause` reports true
    pub fn with_pause_source(mut self, pause: Arc<dyn PauseSource>) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }

    /// Attribute names requested on every receive
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// Run sweeps until shutdown
    ///
    /// A queue service error ends the instance with `Err`; restarting it is
    /// up to the caller. An in-flight poll is never aborted, so shutdown is
    /// observed at most one long-poll wait after it was requested.
    pub async fn run(&self, shutdown: ShutdownToken) -> Result<()> {
        let span = info_span!("processor", processor_id = %self.listener_id);
        self.listen(shutdown).instrument(span).await
    }

    async fn listen(&self, mut shutdown: ShutdownToken) -> Result<()> {
        let queues: Vec<&str> = self
            .config
            .queues
            .iter()
            .map(|queue| queue.arn.name())
            .collect();
        info!(
            queues = ?queues,
            batch_size = self.config.batch_size,
            high_priority_wait = %format_duration(self.config.high_priority_wait),
            "Started listening loop for source queues"
        );

        let mut planner =
            SweepPlanner::new(self.config.queues.len(), self.config.high_priority_wait);
        while !shutdown.is_shutdown() {
            planner.begin_sweep();
            if let Err(e) = self.sweep(&mut planner, &mut shutdown).await {
                error!(error = %e, "Processor threw an error and stopped");
                return Err(e);
            }
        }

        info!(sweeps = planner.sweeps(), "Processor terminated by shutdown request");
        Ok(())
    }

    /// Visit the queues, highest priority first, until a full pass comes back empty
    async fn sweep(&self, planner: &mut SweepPlanner, shutdown: &mut ShutdownToken) -> Result<()> {
        while !shutdown.is_shutdown() {
            if self.is_paused() {
                trace!("Processor is paused");
                if shutdown.sleep(self.config.pause_check_interval).await {
                    break;
                }
                planner.restart();
                continue;
            }

            let Some(poll) = planner.next_poll() else {
                break;
            };
            let had_messages = self.poll_queue(poll, shutdown).await?;
            planner.record(had_messages);
        }
        Ok(())
    }

    async fn poll_queue(&self, poll: PollRequest, shutdown: &ShutdownToken) -> Result<bool> {
        let queue = &self.config.queues[poll.queue_index];
        let messages = self
            .client
            .receive(
                &queue.endpoint,
                self.config.batch_size,
                poll.wait,
                &self.attribute_names,
            )
            .await?;

        if messages.is_empty() {
            trace!(queue_rank = queue.rank, wait = ?poll.wait, "Polling cycle returned no messages");
            return Ok(false);
        }

        debug!(
            queue_rank = queue.rank,
            count = messages.len(),
            "Received messages"
        );
        Ok(self
            .dispatcher
            .dispatch(queue, messages, shutdown.clone())
            .await)
    }

    fn is_paused(&self) -> bool {
        self.pause.as_ref().is_some_and(|pause| pause.is_paused())
    }
}
