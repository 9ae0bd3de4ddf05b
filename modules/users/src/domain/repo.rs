use async_trait::async_trait;
use thiserror::Error;

use crate::contract::Account;

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("duplicate key")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Port for the domain layer: row CRUD on the account table.
///
/// The `bool` returned by mutations tells whether a row was touched.
#[async_trait]
pub trait AccountsRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Account>>;
    async fn find(&self, email: &str) -> anyhow::Result<Option<Account>>;
    async fn insert(&self, account: Account) -> Result<(), InsertError>;
    async fn update_password(&self, email: &str, password: &str) -> anyhow::Result<bool>;
    async fn set_activated(&self, email: &str, activated: bool) -> anyhow::Result<bool>;
    /// Deleting an absent row is not an error.
    async fn delete(&self, email: &str) -> anyhow::Result<bool>;
}
