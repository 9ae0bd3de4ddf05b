use async_trait::async_trait;
use plugkit_bus::{CommandResult, DeliveryHandler, HandlerError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::compensator::Compensator;
use crate::infra::bus::tracker::{InFlight, Settled};

/// Consumes follower results: settles the in-flight entry, then lets the
/// compensator decide whether anything must be undone.
pub struct ResultListener {
    compensator: Arc<Compensator>,
    in_flight: Arc<InFlight>,
}

impl ResultListener {
    pub fn new(compensator: Arc<Compensator>, in_flight: Arc<InFlight>) -> Self {
        Self {
            compensator,
            in_flight,
        }
    }
}

#[async_trait]
impl DeliveryHandler for ResultListener {
    type Message = CommandResult;

    async fn handle(&self, result: CommandResult, routing_key: &str) -> Result<(), HandlerError> {
        match self.in_flight.settle(&result) {
            Settled::Matched(elapsed) => debug!(
                routing_key,
                elapsed_ms = elapsed.as_millis() as u64,
                "result matched in-flight command"
            ),
            Settled::Unknown(id) => info!(
                routing_key,
                correlation_id = %id,
                "result for unknown correlation id"
            ),
            Settled::Uncorrelated => debug!(routing_key, "result without correlation id"),
        }

        self.compensator.on_result(&result).await?;
        Ok(())
    }
}
