use std::sync::Arc;

use plugkit_bus::{Command, CommandMethod, CommandResult};
use tracing::{info, instrument, warn};

use crate::domain::error::ApplyError;
use crate::domain::ports::ExternalAccounts;

/// Applies commands to the external system and turns each attempt into
/// exactly one result.
pub struct Applier {
    accounts: Arc<dyn ExternalAccounts>,
    plugin_id: String,
}

impl Applier {
    pub fn new(accounts: Arc<dyn ExternalAccounts>, plugin_id: impl Into<String>) -> Self {
        Self {
            accounts,
            plugin_id: plugin_id.into(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    #[instrument(
        name = "owncloud.applier.apply",
        skip(self, command),
        fields(method = %command.method, email = %command.email)
    )]
    pub async fn apply(&self, command: &Command) -> Result<(), ApplyError> {
        command.validate()?;
        let password = command.password.as_deref().unwrap_or_default();
        match &command.method {
            CommandMethod::Create => self.accounts.create(&command.email, password).await,
            CommandMethod::Delete => self.accounts.delete(&command.email).await,
            CommandMethod::ChangePassword => {
                self.accounts.set_password(&command.email, password).await
            }
            other => Err(ApplyError::Unsupported(other.to_string())),
        }
    }

    /// Apply and report. Never fails: errors become the result's reason.
    pub async fn apply_and_report(&self, command: &Command) -> CommandResult {
        match self.apply(command).await {
            Ok(()) => {
                info!(method = %command.method, email = %command.email, "request applied");
                CommandResult::success(command, &self.plugin_id)
            }
            Err(e) => {
                warn!(method = %command.method, email = %command.email, error = %e, "request failed");
                CommandResult::failure(command, &self.plugin_id, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct FakeAccounts {
        calls: Mutex<Vec<String>>,
        reject: bool,
    }

    impl FakeAccounts {
        fn record(&self, call: String) -> Result<(), ApplyError> {
            self.calls.lock().push(call);
            if self.reject {
                return Err(ApplyError::Rejected {
                    status_code: 102,
                    message: "User already exists".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ExternalAccounts for FakeAccounts {
        async fn create(&self, user_id: &str, password: &str) -> Result<(), ApplyError> {
            self.record(format!("create {user_id} {password}"))
        }
        async fn delete(&self, user_id: &str) -> Result<(), ApplyError> {
            self.record(format!("delete {user_id}"))
        }
        async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ApplyError> {
            self.record(format!("password {user_id} {password}"))
        }
    }

    fn applier(fake: Arc<FakeAccounts>) -> Applier {
        Applier::new(fake, "owncloud")
    }

    #[tokio::test]
    async fn supported_methods_reach_the_external_system() {
        let fake = Arc::new(FakeAccounts::default());
        let a = applier(fake.clone());

        let created = a
            .apply_and_report(&Command::create("A", "a@b.com", "p", true))
            .await;
        assert!(created.is_success());
        assert_eq!(created.plugin, "owncloud");
        a.apply_and_report(&Command::change_password("a@b.com", "n")).await;
        a.apply_and_report(&Command::delete("a@b.com")).await;

        assert_eq!(
            fake.calls.lock().clone(),
            vec!["create a@b.com p", "password a@b.com n", "delete a@b.com"]
        );
    }

    #[tokio::test]
    async fn disable_is_reported_as_unsupported() {
        let fake = Arc::new(FakeAccounts::default());
        let result = applier(fake.clone())
            .apply_and_report(&Command::disable("a@b.com"))
            .await;

        assert_eq!(result.method, CommandMethod::Disable);
        assert_eq!(result.error(), Some("unsupported method: Disable"));
        assert!(fake.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn create_without_password_fails_before_any_call() {
        let fake = Arc::new(FakeAccounts::default());
        let mut cmd = Command::create("A", "a@b.com", "", false);
        cmd.password = None;

        let result = applier(fake.clone()).apply_and_report(&cmd).await;
        assert!(!result.is_success());
        assert!(fake.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn remote_rejection_keeps_correlation_and_reason() {
        let fake = Arc::new(FakeAccounts {
            reject: true,
            ..FakeAccounts::default()
        });
        let id = uuid::Uuid::new_v4();
        let cmd = Command::create("A", "a@b.com", "p", false).with_correlation_id(id);

        let result = applier(fake).apply_and_report(&cmd).await;
        assert_eq!(result.correlation_id, Some(id));
        assert_eq!(result.email, "a@b.com");
        assert!(result.err.contains("User already exists"));
    }

    #[tokio::test]
    #[traced_test]
    async fn outcomes_are_logged_with_the_failure_reason() {
        let ok = applier(Arc::new(FakeAccounts::default()));
        ok.apply_and_report(&Command::delete("ok@b.com")).await;

        let rejecting = applier(Arc::new(FakeAccounts {
            reject: true,
            ..FakeAccounts::default()
        }));
        rejecting
            .apply_and_report(&Command::delete("bad@b.com"))
            .await;

        assert!(logs_contain("request applied"));
        assert!(logs_contain("request failed"));
        assert!(logs_contain("User already exists"));
    }
}
