use async_trait::async_trait;
use plugkit_bus::{
    Broker, Command, CommandMethod, Consumer, DeliveryHandler, HandlerError, MemoryBroker,
    Publisher, QueueBinding, JSON_CONTENT_TYPE,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, Command)>>,
    fail_on: Option<String>,
}

#[async_trait]
impl DeliveryHandler for Recorder {
    type Message = Command;

    async fn handle(&self, message: Command, routing_key: &str) -> Result<(), HandlerError> {
        let email = message.email.clone();
        self.seen.lock().await.push((routing_key.to_string(), message));
        if self.fail_on.as_deref() == Some(email.as_str()) {
            return Err(format!("refusing {email}").into());
        }
        Ok(())
    }
}

async fn setup() -> (Arc<MemoryBroker>, Publisher) {
    let broker = Arc::new(MemoryBroker::new());
    broker.declare_topic_exchange("users_topic").await.unwrap();
    let publisher = Publisher::new(broker.clone(), "users_topic");
    (broker, publisher)
}

#[tokio::test]
#[traced_test]
async fn malformed_payload_does_not_stop_the_loop() {
    let (broker, publisher) = setup().await;
    let consumer = Consumer::bind(broker.as_ref(), QueueBinding::new("users_topic", "*.req"))
        .await
        .unwrap();

    broker
        .publish("users_topic", "users.req", b"{not json", JSON_CONTENT_TYPE)
        .await
        .unwrap();
    publisher
        .publish_json("users.req", &Command::delete("a@b.com"))
        .await
        .unwrap();
    broker.close().await.unwrap();

    let handler = Arc::new(Recorder::default());
    let summary = consumer.run(handler.clone(), CancellationToken::new()).await;

    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.handled, 1);
    let seen = handler.seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "users.req");
    assert_eq!(seen[0].1.method, CommandMethod::Delete);
    assert!(logs_contain("skipping malformed delivery"));
}

#[tokio::test]
async fn handler_errors_are_counted_and_order_is_kept() {
    let (broker, publisher) = setup().await;
    let consumer = Consumer::bind(broker.as_ref(), QueueBinding::new("users_topic", "*.req"))
        .await
        .unwrap();

    for email in ["1@x", "2@x", "3@x"] {
        publisher
            .publish_json("users.req", &Command::delete(email))
            .await
            .unwrap();
    }
    broker.close().await.unwrap();

    let handler = Arc::new(Recorder {
        fail_on: Some("2@x".into()),
        ..Recorder::default()
    });
    let summary = consumer.run(handler.clone(), CancellationToken::new()).await;

    assert_eq!(summary.handled, 2);
    assert_eq!(summary.failed, 1);
    let order: Vec<String> = handler
        .seen
        .lock()
        .await
        .iter()
        .map(|(_, c)| c.email.clone())
        .collect();
    assert_eq!(order, vec!["1@x", "2@x", "3@x"]);
}

#[tokio::test]
async fn cancellation_ends_an_idle_loop() {
    let (broker, _) = setup().await;
    let consumer = Consumer::bind(broker.as_ref(), QueueBinding::new("users_topic", "*.users"))
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(consumer.run(Arc::new(Recorder::default()), cancel.clone()));

    cancel.cancel();
    let summary = tokio::time::timeout(std::time::Duration::from_secs(2), task)
        .await
        .expect("loop should stop")
        .unwrap();
    assert_eq!(summary.handled, 0);
}

#[tokio::test]
async fn commands_without_a_bound_queue_are_lost() {
    let (broker, publisher) = setup().await;
    publisher
        .publish_json("users.req", &Command::disable("gone@x"))
        .await
        .unwrap();
    assert_eq!(broker.dropped(), 1);
}
