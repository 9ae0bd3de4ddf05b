use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::BusError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// When a delivery is acknowledged to the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckMode {
    /// Acknowledged by the broker on receipt (at-most-once).
    #[default]
    OnReceipt,
    /// Acknowledged after the handler returns. Opt-in; a crash mid-handle
    /// leads to redelivery.
    AfterHandle,
}

/// A queue bound to an exchange with a topic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub exchange: String,
    /// Empty for a broker-named, exclusive queue.
    pub queue: String,
    pub pattern: String,
    pub durable: bool,
    pub ack_mode: AckMode,
}

impl QueueBinding {
    pub fn new(exchange: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            queue: String::new(),
            pattern: pattern.into(),
            durable: false,
            ack_mode: AckMode::default(),
        }
    }

    pub fn named(mut self, queue: impl Into<String>, durable: bool) -> Self {
        self.queue = queue.into();
        self.durable = durable;
        self
    }

    pub fn with_ack_mode(mut self, mode: AckMode) -> Self {
        self.ack_mode = mode;
        self
    }
}

/// Acknowledges a single delivery.
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> Result<(), BusError>;
}

/// One message received from a bound queue.
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
    pub(crate) acker: Option<Box<dyn Acker>>,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
            content_type: None,
            acker: None,
        }
    }

    pub fn requires_ack(&self) -> bool {
        self.acker.is_some()
    }

    /// No-op for deliveries that were acknowledged on receipt.
    pub async fn ack(self) -> Result<(), BusError> {
        match self.acker {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("routing_key", &self.routing_key)
            .field("payload_len", &self.payload.len())
            .field("content_type", &self.content_type)
            .field("requires_ack", &self.requires_ack())
            .finish()
    }
}

pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BusError>> + Send>>;

/// A topic-exchange broker client.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Idempotent; durable and not auto-deleted.
    async fn declare_topic_exchange(&self, name: &str) -> Result<(), BusError>;

    /// Non-mandatory publish. The broker may drop the message when no queue
    /// matches.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<(), BusError>;

    /// Declare and bind the queue, then start consuming from it.
    async fn subscribe(&self, binding: QueueBinding) -> Result<DeliveryStream, BusError>;

    fn is_connected(&self) -> bool;

    async fn close(&self) -> Result<(), BusError>;

    fn kind(&self) -> &'static str;
}
