use plugkit_bus::Broker;
use plugkit_db::DbHandle;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider of plugin-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    fn get_plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value>;
}

/// Shared handles given to every plugin. Built once by the host.
#[derive(Clone)]
pub struct PluginCtx {
    pub(crate) db: Option<Arc<DbHandle>>,
    pub(crate) broker: Option<Arc<dyn Broker>>,
    pub(crate) exchange: Arc<str>,
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) plugin_name: Option<Arc<str>>,
}

pub struct PluginCtxBuilder {
    inner: PluginCtx,
}

impl PluginCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: PluginCtx {
                db: None,
                broker: None,
                exchange: Arc::from(plugkit_bus::DEFAULT_EXCHANGE),
                config_provider: None,
                cancellation_token: token,
                plugin_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: Arc<DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn Broker>, exchange: &str) -> Self {
        self.inner.broker = Some(broker);
        self.inner.exchange = Arc::from(exchange);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn build(self) -> PluginCtx {
        self.inner
    }
}

impl PluginCtx {
    /// Scope the context to one plugin (used by the registry).
    pub fn for_plugin(mut self, name: &str) -> Self {
        self.plugin_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn db(&self) -> Option<Arc<DbHandle>> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<Arc<DbHandle>> {
        self.db
            .clone()
            .ok_or_else(|| anyhow::anyhow!("database is not configured"))
    }

    pub fn broker(&self) -> Option<Arc<dyn Broker>> {
        self.broker.clone()
    }

    pub fn broker_required(&self) -> anyhow::Result<Arc<dyn Broker>> {
        self.broker
            .clone()
            .ok_or_else(|| anyhow::anyhow!("message broker is not configured"))
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_plugin(&self) -> Option<&str> {
        self.plugin_name.as_deref()
    }

    /// Deserialize the plugin's section into `T`, falling back to
    /// `T::default()` when the section is missing or invalid.
    pub fn plugin_config<T: DeserializeOwned + Default>(&self) -> T {
        match (&self.plugin_name, &self.config_provider) {
            (Some(name), Some(p)) => p
                .get_plugin_config(name)
                .and_then(|v| match serde_json::from_value::<T>(v.clone()) {
                    Ok(cfg) => Some(cfg),
                    Err(e) => {
                        tracing::warn!(plugin = %name, error = %e, "invalid plugin config; using defaults");
                        None
                    }
                })
                .unwrap_or_default(),
            _ => T::default(),
        }
    }

    /// Strict variant: a missing or invalid section is an error.
    pub fn plugin_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .plugin_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a plugin"))?;
        let prov = self
            .config_provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no ConfigProvider"))?;
        let val = prov
            .get_plugin_config(name)
            .ok_or_else(|| anyhow::anyhow!("missing plugin config: {name}"))?;
        serde_json::from_value(val.clone()).map_err(|e| anyhow::anyhow!("invalid {name} config: {e}"))
    }
}
