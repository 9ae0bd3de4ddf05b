use async_trait::async_trait;
use plugkit_bus::{Command, DeliveryHandler, HandlerError, Publisher};
use std::sync::Arc;
use tracing::debug;

use crate::domain::applier::Applier;

/// Applies each received command and answers on the result routing key.
pub struct CommandListener {
    applier: Arc<Applier>,
    publisher: Publisher,
    result_key: String,
}

impl CommandListener {
    pub fn new(applier: Arc<Applier>, publisher: Publisher, result_key: impl Into<String>) -> Self {
        Self {
            applier,
            publisher,
            result_key: result_key.into(),
        }
    }
}

#[async_trait]
impl DeliveryHandler for CommandListener {
    type Message = Command;

    async fn handle(&self, command: Command, routing_key: &str) -> Result<(), HandlerError> {
        debug!(routing_key, method = %command.method, email = %command.email, "command received");
        let result = self.applier.apply_and_report(&command).await;
        self.publisher
            .publish_json(&self.result_key, &result)
            .await?;
        Ok(())
    }
}
