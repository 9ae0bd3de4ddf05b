use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::PluginCtx;
use crate::request::{PlugRequest, PlugResponse};

/// Outcome of a plugin health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: String::new(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// A hosted plugin.
///
/// The host calls `init` once with the plugin's scoped context, then
/// `activate` once every plugin has been initialized. `deactivate` runs on
/// shutdown in reverse registration order. `dispatch` may be called
/// concurrently at any time after `activate`.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Wiring only: read config, build services, run migrations.
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()>;

    /// The "plugin activated" signal. Background consumers start here.
    async fn activate(&self, ctx: &PluginCtx) -> anyhow::Result<()>;

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    async fn deactivate(&self) -> anyhow::Result<()>;

    /// Answer an inbound request. Return 404 for paths the plugin does not own.
    async fn dispatch(&self, req: PlugRequest) -> PlugResponse;
}
