//! Queue Prioritizer - Main Entry Point
//! Pumps ranked source queues into one output queue with backpressure

mod logging;
mod processors;
mod settings;
mod supervisor;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use prioritizer_core::application::scheduler::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use prioritizer_core::application::{
    shutdown_channel, BackpressureMonitor, DlqRedriver, MessagePump, PriorityScheduler,
};
use prioritizer_core::port::QueueClient;
use prioritizer_infra_sqs::{SqsClientConfig, SqsQueueClient};

use processors::SyntheticFailureHandler;
use settings::Args;
use supervisor::supervise;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    logging::init_logging()?;
    info!("Queue Prioritizer v{} starting...", VERSION);

    // 2. Load and validate configuration
    let args = Args::parse();
    let priority = args.priority_settings();
    let output = args.output_settings();

    let config = Arc::new(
        priority
            .clone()
            .into_config()
            .context("Invalid source queue settings")?,
    );
    output
        .validate(&config.region)
        .context("Invalid output queue settings")?;

    // 3. Queue service client (one region for every queue)
    let client: Arc<dyn QueueClient> = Arc::new(
        SqsQueueClient::connect(&SqsClientConfig {
            region: config.region.clone(),
            endpoint_url: args.endpoint_url.clone(),
        })
        .await,
    );

    // 4. Backpressure monitor and pump
    let monitor = Arc::new(BackpressureMonitor::from_settings(client.clone(), &output)?);
    let pump = MessagePump::start(config.clone(), client.clone(), &monitor).await;
    if pump.is_paused() {
        warn!("Output queue is above its throttle depth, pump starts paused");
    }

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut tasks = JoinSet::new();

    {
        let monitor = Arc::clone(&monitor);
        let token = shutdown_tx.subscribe();
        tasks.spawn(async move { monitor.run(token).await });
    }

    info!(
        processor_count = config.processor_count,
        queues = config.queues.len(),
        "Starting message pump..."
    );
    for scheduler in pump.schedulers() {
        tasks.spawn(supervise(scheduler, shutdown_tx.subscribe()));
    }

    // 5. Optional DLQ redriver
    if let Some(settings) = output.redrive_settings(&priority)? {
        let redrive_config = Arc::new(settings.into_config()?);
        info!(
            dlq = %redrive_config.queues[0].arn,
            delay = %prioritizer_core::domain::format_duration(output.redrive_delay),
            "Starting DLQ redriver..."
        );
        let redriver = DlqRedriver::new(redrive_config, client.clone(), output.redrive_delay);
        tasks.spawn(supervise(redriver.into_scheduler(), shutdown_tx.subscribe()));
    }

    // 6. Optional synthetic consumer of the output queue
    if let (Some(settings), Some(fail_every)) =
        (output.output_consumer_settings(&priority), output.fail_every)
    {
        info!(fail_every, "Starting synthetic output consumer...");
        let consumer = PriorityScheduler::new(
            "output-consumer",
            Arc::new(settings.into_config()?),
            client.clone(),
            Arc::new(SyntheticFailureHandler::new(fail_every)),
        );
        tasks.spawn(supervise(consumer, shutdown_tx.subscribe()));
    }
    drop(shutdown_rx);

    info!("System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Waiting for in-flight polls...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    let drained = tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(
            remaining = tasks.len(),
            "Graceful shutdown timed out, aborting remaining tasks"
        );
        tasks.abort_all();
    }

    info!("Shutdown complete.");
    Ok(())
}
