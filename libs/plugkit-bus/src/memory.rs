//! Process-local topic exchange with the same matching rules as AMQP.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::broker::{Broker, Delivery, DeliveryStream, QueueBinding};
use crate::error::BusError;
use crate::routing::topic_matches;

struct MemoryQueue {
    exchange: String,
    patterns: Vec<String>,
    tx: mpsc::UnboundedSender<Delivery>,
}

#[derive(Default)]
pub struct MemoryBroker {
    exchanges: DashSet<String>,
    queues: DashMap<String, MemoryQueue>,
    published: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted by `publish`.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Messages that matched no bound queue and were discarded.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_topic_exchange(&self, name: &str) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        self.exchanges.insert(name.to_string());
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        if !self.exchanges.contains(exchange) {
            return Err(BusError::Publish {
                routing_key: routing_key.to_string(),
                cause: format!("no exchange '{exchange}'"),
            });
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0usize;
        let mut gone = Vec::new();
        for entry in self.queues.iter() {
            let q = entry.value();
            if q.exchange != exchange || !q.patterns.iter().any(|p| topic_matches(p, routing_key)) {
                continue;
            }
            let mut delivery = Delivery::new(routing_key, payload.to_vec());
            delivery.content_type = Some(content_type.to_string());
            if q.tx.send(delivery).is_ok() {
                delivered += 1;
            } else {
                gone.push(entry.key().clone());
            }
        }
        for name in gone {
            self.queues.remove(&name);
        }

        if delivered == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(exchange, routing_key, "no queue bound; message dropped");
        } else {
            trace!(exchange, routing_key, queues = delivered, "message routed");
        }
        Ok(())
    }

    async fn subscribe(&self, binding: QueueBinding) -> Result<DeliveryStream, BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        if !self.exchanges.contains(&binding.exchange) {
            return Err(BusError::Declaration {
                what: "binding",
                name: binding.exchange.clone(),
                cause: "exchange not declared".to_string(),
            });
        }
        let name = if binding.queue.is_empty() {
            format!("amq.gen-{}", Uuid::new_v4())
        } else {
            binding.queue.clone()
        };

        // A second consumer on a named queue takes over the queue.
        let (tx, rx) = mpsc::unbounded_channel();
        let mut patterns = self
            .queues
            .remove(&name)
            .map(|(_, q)| q.patterns)
            .unwrap_or_default();
        if !patterns.contains(&binding.pattern) {
            patterns.push(binding.pattern.clone());
        }
        self.queues.insert(
            name.clone(),
            MemoryQueue {
                exchange: binding.exchange.clone(),
                patterns,
                tx,
            },
        );
        debug!(queue = %name, pattern = %binding.pattern, "queue bound");

        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<(), BusError> {
        self.closed.store(true, Ordering::Release);
        // Dropping the senders ends every consumer stream.
        self.queues.clear();
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::JSON_CONTENT_TYPE;

    async fn broker() -> MemoryBroker {
        let b = MemoryBroker::new();
        b.declare_topic_exchange("users_topic").await.unwrap();
        b
    }

    #[tokio::test]
    async fn unbound_publish_is_dropped() {
        let b = broker().await;
        b.publish("users_topic", "users.req", b"{}", JSON_CONTENT_TYPE)
            .await
            .unwrap();
        assert_eq!(b.published(), 1);
        assert_eq!(b.dropped(), 1);
    }

    #[tokio::test]
    async fn routes_by_topic_pattern() {
        let b = broker().await;
        let mut req = b
            .subscribe(QueueBinding::new("users_topic", "*.req"))
            .await
            .unwrap();
        let mut results = b
            .subscribe(QueueBinding::new("users_topic", "*.users"))
            .await
            .unwrap();

        b.publish("users_topic", "users.req", b"cmd", JSON_CONTENT_TYPE)
            .await
            .unwrap();
        b.publish("users_topic", "owncloud.users", b"res", JSON_CONTENT_TYPE)
            .await
            .unwrap();

        let d = req.next().await.unwrap().unwrap();
        assert_eq!(d.routing_key, "users.req");
        assert_eq!(d.payload, b"cmd");
        assert!(!d.requires_ack());

        let d = results.next().await.unwrap().unwrap();
        assert_eq!(d.routing_key, "owncloud.users");
        assert_eq!(b.dropped(), 0);
    }

    #[tokio::test]
    async fn publish_to_undeclared_exchange_fails() {
        let b = MemoryBroker::new();
        let err = b
            .publish("nope", "users.req", b"{}", JSON_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Publish { .. }));
    }

    #[tokio::test]
    async fn close_ends_streams() {
        let b = broker().await;
        let mut s = b
            .subscribe(QueueBinding::new("users_topic", "#"))
            .await
            .unwrap();
        b.close().await.unwrap();
        assert!(s.next().await.is_none());
        assert!(!b.is_connected());
    }
}
