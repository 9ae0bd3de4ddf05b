use async_trait::async_trait;
use plugkit_bus::{Command, Publisher};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::CommandSink;
use crate::infra::bus::tracker::InFlight;

/// Publishes commands on the follower routing key, stamping each with a fresh
/// correlation id.
pub struct BusCommandSink {
    publisher: Publisher,
    routing_key: String,
    in_flight: Arc<InFlight>,
}

impl BusCommandSink {
    pub fn new(publisher: Publisher, routing_key: impl Into<String>, in_flight: Arc<InFlight>) -> Self {
        Self {
            publisher,
            routing_key: routing_key.into(),
            in_flight,
        }
    }
}

#[async_trait]
impl CommandSink for BusCommandSink {
    async fn send(&self, command: Command) -> anyhow::Result<()> {
        command.validate()?;
        let id = command.correlation_id.unwrap_or_else(Uuid::new_v4);
        let command = command.with_correlation_id(id);

        self.in_flight.record(&command);
        if let Err(e) = self.publisher.publish_json(&self.routing_key, &command).await {
            self.in_flight.forget(&id);
            return Err(e.into());
        }
        debug!(
            method = %command.method,
            email = %command.email,
            correlation_id = %id,
            routing_key = %self.routing_key,
            "command sent"
        );
        Ok(())
    }
}
