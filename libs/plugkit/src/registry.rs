//! Plugin discovery and the ordered hosting phases.

use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::context::PluginCtx;
use crate::contracts::{HealthStatus, Plugin};
use crate::request::{PlugRequest, PlugResponse};

/// Submitted by each plugin crate via `inventory::submit!`.
pub struct Registrator {
    pub name: &'static str,
    pub build: fn() -> Arc<dyn Plugin>,
}

inventory::collect!(Registrator);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin '{0}' is registered more than once")]
    Duplicate(&'static str),

    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    #[error("no plugins to host")]
    Empty,

    #[error("init failed for plugin '{plugin}'")]
    Init {
        plugin: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("activate failed for plugin '{plugin}'")]
    Activate {
        plugin: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

pub struct PluginEntry {
    pub name: &'static str,
    pub plugin: Arc<dyn Plugin>,
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry").field("name", &self.name).finish()
    }
}

/// Plugins in activation order.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: Vec<PluginEntry>,
}

impl PluginRegistry {
    /// Collect every linked plugin, keeping only `only` when it is non-empty.
    /// Plugins are ordered by name.
    pub fn discover(only: &[String]) -> Result<Self, RegistryError> {
        let mut by_name: BTreeMap<&'static str, fn() -> Arc<dyn Plugin>> = BTreeMap::new();
        for r in inventory::iter::<Registrator> {
            if by_name.insert(r.name, r.build).is_some() {
                return Err(RegistryError::Duplicate(r.name));
            }
        }
        for wanted in only {
            if !by_name.contains_key(wanted.as_str()) {
                return Err(RegistryError::UnknownPlugin(wanted.clone()));
            }
        }
        let plugins = by_name
            .into_iter()
            .filter(|(name, _)| only.is_empty() || only.iter().any(|w| w == name))
            .map(|(name, build)| PluginEntry {
                name,
                plugin: build(),
            })
            .collect();
        Self::from_entries(plugins)
    }

    /// Build from explicit instances, in the given order.
    pub fn from_entries(plugins: Vec<PluginEntry>) -> Result<Self, RegistryError> {
        if plugins.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (i, e) in plugins.iter().enumerate() {
            if plugins[..i].iter().any(|p| p.name == e.name) {
                return Err(RegistryError::Duplicate(e.name));
            }
        }
        Ok(Self { plugins })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|e| e.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.plugin.clone())
    }

    pub async fn run_init_phase(&self, base: &PluginCtx) -> Result<(), RegistryError> {
        for e in &self.plugins {
            let ctx = base.clone().for_plugin(e.name);
            e.plugin
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    plugin: e.name,
                    source,
                })?;
            tracing::debug!(plugin = e.name, "initialized");
        }
        Ok(())
    }

    pub async fn run_activate_phase(&self, base: &PluginCtx) -> Result<(), RegistryError> {
        for e in &self.plugins {
            let ctx = base.clone().for_plugin(e.name);
            e.plugin
                .activate(&ctx)
                .await
                .map_err(|source| RegistryError::Activate {
                    plugin: e.name,
                    source,
                })?;
            tracing::info!(plugin = e.name, "activated");
        }
        Ok(())
    }

    /// Reverse order; failures are logged and do not stop the phase.
    pub async fn run_deactivate_phase(&self) {
        for e in self.plugins.iter().rev() {
            match e.plugin.deactivate().await {
                Ok(()) => tracing::info!(plugin = e.name, "deactivated"),
                Err(err) => tracing::warn!(plugin = e.name, error = %err, "deactivate failed"),
            }
        }
    }

    pub async fn health(&self) -> BTreeMap<&'static str, HealthStatus> {
        let mut out = BTreeMap::new();
        for e in &self.plugins {
            out.insert(e.name, e.plugin.health_check().await);
        }
        out
    }

    /// Offer the request to each plugin in order; the first non-404 answer
    /// wins. Otherwise the first 404 that carries a body is returned.
    pub async fn dispatch(&self, req: PlugRequest) -> PlugResponse {
        let mut miss: Option<PlugResponse> = None;
        for e in &self.plugins {
            let resp = e.plugin.dispatch(req.clone()).await;
            if resp.status != StatusCode::NOT_FOUND {
                return resp;
            }
            if miss.is_none() && !resp.body.is_empty() {
                miss = Some(resp);
            }
        }
        miss.unwrap_or_else(PlugResponse::not_found)
    }
}
