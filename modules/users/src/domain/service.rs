use std::sync::Arc;

use plugkit_bus::Command;
use tracing::{debug, info, instrument, warn};

use crate::contract::{Account, NewAccount};
use crate::domain::error::DomainError;
use crate::domain::ports::CommandSink;
use crate::domain::repo::{AccountsRepository, InsertError};

/// Account operations. Every successful mutation is followed by exactly one
/// command to the followers; a failed publish is logged and does not undo the
/// local write.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn AccountsRepository>,
    commands: Arc<dyn CommandSink>,
}

impl Service {
    pub fn new(repo: Arc<dyn AccountsRepository>, commands: Arc<dyn CommandSink>) -> Self {
        Self { repo, commands }
    }

    #[instrument(name = "users.service.list_accounts", skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<Account>, DomainError> {
        let accounts = self
            .repo
            .list()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!(count = accounts.len(), "listed accounts");
        Ok(accounts)
    }

    #[instrument(name = "users.service.get_account", skip(self), fields(email = %email))]
    pub async fn get_account(&self, email: &str) -> Result<Account, DomainError> {
        require_email(email)?;
        self.repo
            .find(email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::not_found(email))
    }

    #[instrument(
        name = "users.service.add_account",
        skip(self, new_account),
        fields(email = %new_account.email)
    )]
    pub async fn add_account(&self, new_account: NewAccount) -> Result<Account, DomainError> {
        require_email(&new_account.email)?;
        require_password(&new_account.password)?;

        let account = Account {
            email: new_account.email,
            name: new_account.name,
            password: new_account.password,
            activated: new_account.activated.unwrap_or(false),
            sam: String::new(),
        };

        self.repo
            .insert(account.clone())
            .await
            .map_err(|e| match e {
                InsertError::Duplicate => DomainError::email_exists(&account.email),
                InsertError::Other(e) => DomainError::database(e.to_string()),
            })?;
        info!("account created");

        self.announce(Command::create(
            &account.name,
            &account.email,
            &account.password,
            account.activated,
        ))
        .await;
        Ok(account)
    }

    #[instrument(name = "users.service.change_password", skip(self, password), fields(email = %email))]
    pub async fn change_password(&self, email: &str, password: &str) -> Result<(), DomainError> {
        require_email(email)?;
        require_password(password)?;

        let touched = self
            .repo
            .update_password(email, password)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !touched {
            return Err(DomainError::not_found(email));
        }
        info!("password changed");

        self.announce(Command::change_password(email, password)).await;
        Ok(())
    }

    #[instrument(name = "users.service.disable_account", skip(self), fields(email = %email))]
    pub async fn disable_account(&self, email: &str) -> Result<(), DomainError> {
        require_email(email)?;

        let touched = self
            .repo
            .set_activated(email, false)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !touched {
            return Err(DomainError::not_found(email));
        }
        info!("account disabled");

        self.announce(Command::disable(email)).await;
        Ok(())
    }

    #[instrument(name = "users.service.delete_account", skip(self), fields(email = %email))]
    pub async fn delete_account(&self, email: &str) -> Result<(), DomainError> {
        require_email(email)?;

        let deleted = self
            .repo
            .delete(email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        // An absent row (e.g. already retracted by the compensator) is not an
        // error; followers may still hold the external account.
        if deleted {
            info!("account deleted");
        } else {
            info!("account already absent");
        }

        self.announce(Command::delete(email)).await;
        Ok(())
    }

    async fn announce(&self, command: Command) {
        let method = command.method.clone();
        if let Err(e) = self.commands.send(command).await {
            warn!(%method, error = %e, "command publish failed");
        }
    }
}

fn require_email(email: &str) -> Result<(), DomainError> {
    if email.trim().is_empty() {
        return Err(DomainError::validation("email", "email is required"));
    }
    Ok(())
}

fn require_password(password: &str) -> Result<(), DomainError> {
    if password.is_empty() {
        return Err(DomainError::validation("password", "password is required"));
    }
    Ok(())
}
