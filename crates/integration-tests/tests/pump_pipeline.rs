//! Pump Pipeline Tests
//!
//! Source queues -> pump -> output queue -> DLQ -> redrive, against in-memory queues

use prioritizer_core::application::{
    shutdown_channel, BackpressureMonitor, DlqRedriver, MessagePump,
};
use prioritizer_core::domain::{OutputQueueSettings, PrioritySettings, PROVENANCE_ATTRIBUTE};
use prioritizer_core::port::queue_client::mocks::{string_attributes, InMemoryQueueClient};
use prioritizer_core::port::QueueClient;
use std::sync::Arc;
use std::time::Duration;

const HIGH: &str = "https://sqs.us-east-1.amazonaws.com/1/high";
const LOW: &str = "https://sqs.us-east-1.amazonaws.com/1/low";
const OUTPUT: &str = "https://sqs.us-east-1.amazonaws.com/1/out";
const DLQ: &str = "https://sqs.us-east-1.amazonaws.com/1/out-dlq";

fn priority_settings() -> PrioritySettings {
    PrioritySettings {
        queue_arns: "arn:aws:sqs:us-east-1:1:high,arn:aws:sqs:us-east-1:1:low".to_string(),
        expected_attributes: "tenant".to_string(),
        pause_check_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

fn output_settings(throttle_depth: u64) -> OutputQueueSettings {
    OutputQueueSettings {
        output_queue_arn: "arn:aws:sqs:us-east-1:1:out".to_string(),
        throttle_depth,
        depth_check_interval: Duration::from_millis(5),
        redrive_dlq_arn: Some("arn:aws:sqs:us-east-1:1:out-dlq".to_string()),
        redrive_delay: Duration::from_secs(10),
        fail_every: None,
    }
}

#[tokio::test]
async fn test_pump_moves_messages_in_priority_order() {
    let client = Arc::new(InMemoryQueueClient::new());
    client.push_with_attributes(LOW, "low-1", string_attributes(&[("tenant", "acme")]));
    client.push(HIGH, "high-1");
    client.push(HIGH, "high-2");

    let output = output_settings(100);
    output.validate("us-east-1").unwrap();
    let monitor = BackpressureMonitor::from_settings(client.clone(), &output).unwrap();
    let config = Arc::new(priority_settings().into_config().unwrap());
    let pump = MessagePump::start(config, client.clone(), &monitor).await;

    let (tx, token) = shutdown_channel();
    client.halt_after_polls(7, tx);
    pump.scheduler("pump-0").run(token).await.unwrap();

    let forwarded: Vec<String> = client
        .pending(OUTPUT)
        .into_iter()
        .map(|message| message.body)
        .collect();
    assert_eq!(forwarded, vec!["high-1", "high-2", "low-1"]);

    let low = client
        .pending(OUTPUT)
        .into_iter()
        .find(|message| message.body == "low-1")
        .unwrap();
    assert_eq!(low.attribute(PROVENANCE_ATTRIBUTE), Some(LOW));
    assert_eq!(low.attribute("tenant"), Some("acme"));
    assert!(client.pending(HIGH).is_empty());
    assert!(client.pending(LOW).is_empty());
    assert_eq!(client.deletes().len(), 3);
}

#[tokio::test]
async fn test_full_output_queue_pauses_and_resumes_the_pump() {
    let client = Arc::new(InMemoryQueueClient::new());
    client.push(HIGH, "waiting");
    client.script_depths([Ok(5), Ok(5), Ok(0)]);

    let output = output_settings(5);
    let monitor = Arc::new(BackpressureMonitor::from_settings(client.clone(), &output).unwrap());
    let config = Arc::new(priority_settings().into_config().unwrap());
    let pump = MessagePump::start(config, client.clone(), &monitor).await;
    assert!(pump.is_paused());

    // Resumed run: deliver, drain both queues, stop on the next sweep
    let (tx, token) = shutdown_channel();
    client.halt_after_polls(4, tx);
    let scheduler = pump.scheduler("pump-0");
    let pump_task = tokio::spawn(async move { scheduler.run(token).await });

    // Paused: nothing is polled while the monitor has not sampled again
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(client.polls().is_empty());

    // Two more samples: still full, then drained
    assert_eq!(monitor.check_depth().await, None);
    assert_eq!(monitor.check_depth().await, Some(false));
    assert!(!pump.is_paused());

    tokio::time::timeout(Duration::from_secs(5), pump_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(client.pending(OUTPUT).len(), 1);
    assert!(client.pending(HIGH).is_empty());
}

#[tokio::test]
async fn test_dead_lettered_message_is_redriven_to_its_source() {
    let client = Arc::new(InMemoryQueueClient::new());
    client.push_with_attributes(LOW, "retry-me", string_attributes(&[("tenant", "acme")]));

    let output = output_settings(100);
    let monitor = BackpressureMonitor::from_settings(client.clone(), &output).unwrap();
    let priority = priority_settings();
    let pump = MessagePump::start(
        Arc::new(priority.clone().into_config().unwrap()),
        client.clone(),
        &monitor,
    )
    .await;

    let (tx, token) = shutdown_channel();
    client.halt_after_polls(4, tx);
    pump.scheduler("pump-0").run(token).await.unwrap();

    // Simulate the output queue's redrive policy moving the message to its DLQ
    let dead = client
        .receive(OUTPUT, 10, Duration::ZERO, &[])
        .await
        .unwrap()
        .remove(0);
    client.push_with_attributes(DLQ, &dead.body, dead.attributes.clone());

    let redrive_config = output.redrive_settings(&priority).unwrap().unwrap();
    let redriver = DlqRedriver::new(
        Arc::new(redrive_config.into_config().unwrap()),
        client.clone(),
        output.redrive_delay,
    );
    let (tx, token) = shutdown_channel();
    let polls_so_far = client.polls().len();
    client.halt_after_polls(polls_so_far + 1, tx);
    redriver.run(token).await.unwrap();

    let (endpoint, resent) = client.sends().pop().unwrap();
    assert_eq!(endpoint, LOW);
    assert_eq!(resent.body, "retry-me");
    assert_eq!(resent.delay, Duration::from_secs(10));
    assert!(!resent.attributes.contains_key(PROVENANCE_ATTRIBUTE));
    assert_eq!(resent.attributes["tenant"].as_str(), Some("acme"));
    assert!(client.pending(DLQ).is_empty());
    assert_eq!(client.pending(LOW).len(), 1);
}
