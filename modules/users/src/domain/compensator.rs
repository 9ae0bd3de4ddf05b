//! Backward recovery for creates that a follower could not apply.

use std::sync::Arc;

use plugkit_bus::{Command, CommandMethod, CommandResult};
use tracing::{info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::ports::CommandSink;
use crate::domain::repo::AccountsRepository;

/// What the compensator did with one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The follower applied the command.
    Confirmed,
    /// A create failed remotely; the local record was retracted. `removed` is
    /// false when the record was already gone.
    Retracted { removed: bool },
    /// A non-create command failed remotely. Logged only.
    Unrepaired,
}

pub struct Compensator {
    repo: Arc<dyn AccountsRepository>,
    /// Set when followers should also hear about the rollback.
    notify: Option<Arc<dyn CommandSink>>,
}

impl Compensator {
    pub fn new(repo: Arc<dyn AccountsRepository>) -> Self {
        Self { repo, notify: None }
    }

    pub fn notifying(mut self, sink: Arc<dyn CommandSink>) -> Self {
        self.notify = Some(sink);
        self
    }

    #[instrument(
        name = "users.compensator.on_result",
        skip(self, result),
        fields(method = %result.method, email = %result.email, plugin = %result.plugin)
    )]
    pub async fn on_result(&self, result: &CommandResult) -> Result<Outcome, DomainError> {
        let Some(err) = result.error() else {
            info!("request successfully completed by plugin");
            return Ok(Outcome::Confirmed);
        };

        if result.method != CommandMethod::Create {
            warn!(error = %err, "request did not complete on plugin");
            return Ok(Outcome::Unrepaired);
        }

        warn!(error = %err, "create did not complete on plugin; reversing");
        let removed = self.retract_account(&result.email).await?;
        Ok(Outcome::Retracted { removed })
    }

    /// Delete the local record. Safe to repeat.
    pub async fn retract_account(&self, email: &str) -> Result<bool, DomainError> {
        if email.trim().is_empty() {
            return Err(DomainError::validation("email", "email is required"));
        }
        let removed = self
            .repo
            .delete(email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if removed {
            info!(email, "account retracted");
        } else {
            info!(email, "account already absent; nothing to retract");
        }

        if let (true, Some(sink)) = (removed, &self.notify) {
            if let Err(e) = sink.send(Command::delete(email)).await {
                warn!(email, error = %e, "rollback notification failed");
            }
        }
        Ok(removed)
    }
}
