use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::broker::{Broker, JSON_CONTENT_TYPE};
use crate::error::BusError;

/// Publishes JSON messages to a single exchange.
#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn Broker>,
    exchange: String,
}

impl Publisher {
    pub fn new(broker: Arc<dyn Broker>, exchange: impl Into<String>) -> Self {
        Self {
            broker,
            exchange: exchange.into(),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Fire-and-forget: returns once the broker accepted the frame.
    #[instrument(name = "bus.publish", skip(self, message), fields(exchange = %self.exchange))]
    pub async fn publish_json<T: Serialize + ?Sized>(
        &self,
        routing_key: &str,
        message: &T,
    ) -> Result<(), BusError> {
        let payload = serde_json::to_vec(message).map_err(|e| BusError::Encode(e.to_string()))?;
        self.broker
            .publish(&self.exchange, routing_key, &payload, JSON_CONTENT_TYPE)
            .await
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("broker", &self.broker.kind())
            .field("exchange", &self.exchange)
            .finish()
    }
}
