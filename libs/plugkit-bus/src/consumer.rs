//! Sequential consume loop over one bound queue.

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::broker::{Broker, DeliveryStream, QueueBinding};
use crate::error::BusError;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handles decoded messages of one type.
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    type Message: DeserializeOwned + Send;

    /// An `Err` is logged; the loop moves on to the next delivery.
    async fn handle(&self, message: Self::Message, routing_key: &str) -> Result<(), HandlerError>;
}

/// Counters reported when a consume loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub handled: u64,
    pub failed: u64,
    pub malformed: u64,
}

pub struct Consumer {
    queue: String,
    stream: DeliveryStream,
}

impl Consumer {
    /// Declare, bind and start consuming. The returned consumer does nothing
    /// until [`Consumer::run`] is polled.
    pub async fn bind(broker: &dyn Broker, binding: QueueBinding) -> Result<Self, BusError> {
        let queue = if binding.queue.is_empty() {
            binding.pattern.clone()
        } else {
            binding.queue.clone()
        };
        let stream = broker.subscribe(binding).await?;
        Ok(Self { queue, stream })
    }

    pub fn label(&self) -> &str {
        &self.queue
    }

    /// Process deliveries one at a time, in broker order, until the stream
    /// ends or `cancel` fires. Malformed payloads are logged and skipped.
    #[instrument(name = "bus.consume", skip_all, fields(queue = %self.queue))]
    pub async fn run<H: DeliveryHandler>(
        mut self,
        handler: Arc<H>,
        cancel: CancellationToken,
    ) -> ConsumeSummary {
        info!("consume loop started");
        let mut summary = ConsumeSummary::default();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("consume loop cancelled");
                    break;
                }
                next = self.stream.next() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    error!(error = %e, "error receiving delivery");
                    continue;
                }
                None => break,
            };

            let routing_key = delivery.routing_key.clone();
            match serde_json::from_slice::<H::Message>(&delivery.payload) {
                Ok(message) => match handler.handle(message, &routing_key).await {
                    Ok(()) => summary.handled += 1,
                    Err(e) => {
                        summary.failed += 1;
                        error!(routing_key = %routing_key, error = %e, "handler failed");
                    }
                },
                Err(e) => {
                    summary.malformed += 1;
                    let err = BusError::Decode {
                        routing_key: routing_key.clone(),
                        cause: e.to_string(),
                    };
                    warn!(error = %err, "skipping malformed delivery");
                }
            }

            // Manual acks go out after the handler regardless of its outcome;
            // there is no redelivery-driven retry.
            if let Err(e) = delivery.ack().await {
                warn!(routing_key = %routing_key, error = %e, "ack failed");
            }
        }

        info!(
            handled = summary.handled,
            failed = summary.failed,
            malformed = summary.malformed,
            "consume loop ended"
        );
        summary
    }
}
