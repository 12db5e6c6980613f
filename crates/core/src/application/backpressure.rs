// Backpressure Monitor - pauses the pump while the output queue is too deep

use crate::application::scheduler::{execute_guarded, PanicGuardResult, ShutdownToken};
use crate::domain::{format_duration, OutputQueueSettings};
use crate::error::Result;
use crate::port::{PauseListener, PauseSource, QueueClient};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, trace};

/// Pause flag shared by the scheduler instances of one pump
///
/// Written only through [`PauseListener::on_pause_changed`], read by every
/// instance before each queue visit.
#[derive(Debug, Default)]
pub struct PumpState {
    paused: AtomicBool,
}

impl PumpState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PauseSource for PumpState {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

impl PauseListener for PumpState {
    fn on_pause_changed(&self, paused: bool) -> Result<()> {
        if self.paused.swap(paused, Ordering::AcqRel) != paused {
            if paused {
                info!("Paused message pump");
            } else {
                info!("Resumed message pump");
            }
        }
        Ok(())
    }
}

/// Samples the approximate depth of the output queue at a fixed interval
/// and notifies subscribers on every pause/resume transition.
pub struct BackpressureMonitor {
    client: Arc<dyn QueueClient>,
    output_endpoint: String,
    throttle_depth: u64,
    check_interval: Duration,
    paused: AtomicBool,
    listeners: Mutex<Vec<Arc<dyn PauseListener>>>,
}

impl BackpressureMonitor {
    pub fn new(
        client: Arc<dyn QueueClient>,
        output_endpoint: impl Into<String>,
        throttle_depth: u64,
        check_interval: Duration,
    ) -> Self {
        Self {
            client,
            output_endpoint: output_endpoint.into(),
            throttle_depth,
            check_interval,
            paused: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(client: Arc<dyn QueueClient>, settings: &OutputQueueSettings) -> Result<Self> {
        let output = settings.output_queue()?;
        Ok(Self::new(
            client,
            output.to_url(),
            settings.throttle_depth,
            settings.depth_check_interval,
        ))
    }

    pub fn output_endpoint(&self) -> &str {
        &self.output_endpoint
    }

    pub fn subscribe(&self, listener: Arc<dyn PauseListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Last observed state
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Take one depth sample. Returns the new state on a transition.
    ///
    /// A failed query leaves the state unchanged.
    pub async fn check_depth(&self) -> Option<bool> {
        match self.client.approximate_depth(&self.output_endpoint).await {
            Ok(depth) => {
                trace!(depth, threshold = self.throttle_depth, "Output queue depth sampled");
                self.transition(depth >= self.throttle_depth, depth)
            }
            Err(e) => {
                error!(error = %e, "Failed to check output queue depth. Pause state is left unchanged");
                None
            }
        }
    }

    fn transition(&self, paused: bool, depth: u64) -> Option<bool> {
        if self.paused.swap(paused, Ordering::AcqRel) == paused {
            return None;
        }

        let action = if paused { "pause" } else { "resume" };
        info!(
            depth,
            threshold = self.throttle_depth,
            "Need to {action} fetching messages from source queues"
        );
        self.notify(paused);
        Some(paused)
    }

    fn notify(&self, paused: bool) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in listeners {
            match execute_guarded(AssertUnwindSafe(|| listener.on_pause_changed(paused))) {
                PanicGuardResult::Success(Ok(())) => {}
                PanicGuardResult::Success(Err(e)) => {
                    error!(error = %e, "Pause listener rejected a state change");
                }
                PanicGuardResult::Panicked(_) => {
                    error!("Pause listener panicked while handling a state change");
                }
            }
        }
    }

    /// Check depth on every tick until shutdown
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            output = %self.output_endpoint,
            threshold = self.throttle_depth,
            interval = %format_duration(self.check_interval),
            "Output queue depth monitor started"
        );

        let mut tick = interval(self.check_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }
            if shutdown.is_shutdown() {
                break;
            }
            self.check_depth().await;
        }

        info!("Exited output queue depth monitoring");
    }
}
