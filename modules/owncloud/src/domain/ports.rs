use async_trait::async_trait;

use crate::domain::error::ApplyError;

/// Accounts in the external system, addressed by user id (the email).
#[async_trait]
pub trait ExternalAccounts: Send + Sync + 'static {
    async fn create(&self, user_id: &str, password: &str) -> Result<(), ApplyError>;
    async fn delete(&self, user_id: &str) -> Result<(), ApplyError>;
    async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ApplyError>;
}
