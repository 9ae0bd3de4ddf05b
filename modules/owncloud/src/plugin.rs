use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use plugkit::{HealthStatus, Lifecycle, PlugRequest, PlugResponse, Plugin, PluginCtx, RouteTable};
use plugkit_bus::{AckMode, Broker, Consumer, Publisher, QueueBinding, RoutingKey};
use tracing::{debug, info};

use crate::api;
use crate::config::OwncloudConfig;
use crate::domain::applier::Applier;
use crate::infra::{CommandListener, OcsClient};

pub const PLUGIN_NAME: &str = "owncloud";

struct Wired {
    applier: Arc<Applier>,
    routes: RouteTable<Applier>,
    listener: Arc<CommandListener>,
    binding: QueueBinding,
    broker: Arc<dyn Broker>,
}

/// Follower that mirrors account commands into an ownCloud instance and
/// reports each outcome back to the authority.
pub struct OwncloudPlugin {
    wired: ArcSwapOption<Wired>,
    commands: Lifecycle,
}

impl Default for OwncloudPlugin {
    fn default() -> Self {
        Self {
            wired: ArcSwapOption::empty(),
            commands: Lifecycle::new("owncloud.commands"),
        }
    }
}

#[async_trait]
impl Plugin for OwncloudPlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        info!("Initializing owncloud plugin");
        let cfg: OwncloudConfig = ctx.plugin_config();
        debug!(base_url = %cfg.base_url, plugin_id = %cfg.plugin_id, "loaded owncloud config");

        let client = OcsClient::new(&cfg).context("cannot build OCS client")?;
        let applier = Arc::new(Applier::new(Arc::new(client), &cfg.plugin_id));

        let broker = ctx.broker_required()?;
        broker
            .declare_topic_exchange(ctx.exchange())
            .await
            .context("cannot declare exchange")?;

        let result_key = RoutingKey::new(&cfg.plugin_id, &cfg.result_audience).to_string();
        let listener = Arc::new(CommandListener::new(
            applier.clone(),
            Publisher::new(broker.clone(), ctx.exchange()),
            result_key,
        ));

        let ack_mode = if cfg.ack_after_handle {
            AckMode::AfterHandle
        } else {
            AckMode::OnReceipt
        };
        let binding = QueueBinding::new(
            ctx.exchange(),
            RoutingKey::audience_pattern(&cfg.command_audience),
        )
        .named(&cfg.queue, cfg.durable_queue)
        .with_ack_mode(ack_mode);

        self.wired.store(Some(Arc::new(Wired {
            applier,
            routes: api::route_table()?,
            listener,
            binding,
            broker,
        })));
        Ok(())
    }

    async fn activate(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let wired = self
            .wired
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("owncloud plugin not initialized"))?;

        let consumer = Consumer::bind(wired.broker.as_ref(), wired.binding.clone())
            .await
            .context("cannot bind command queue")?;
        info!(queue = consumer.label(), pattern = %wired.binding.pattern, "waiting for requests");

        let listener = wired.listener.clone();
        self.commands
            .start(ctx.cancellation_token().child_token(), move |cancel| async move {
                consumer.run(listener, cancel).await;
                Ok(())
            })?;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.wired.load_full() {
            None => HealthStatus::unhealthy("not initialized"),
            Some(w) if !w.broker.is_connected() => HealthStatus::unhealthy("broker disconnected"),
            Some(_) => HealthStatus::healthy(),
        }
    }

    async fn deactivate(&self) -> anyhow::Result<()> {
        let reason = self.commands.stop(Duration::from_secs(5)).await;
        debug!(?reason, "command consumer stopped");
        Ok(())
    }

    async fn dispatch(&self, req: PlugRequest) -> PlugResponse {
        let Some(wired) = self.wired.load_full() else {
            return PlugResponse::not_found();
        };
        wired
            .routes
            .dispatch(&wired.applier, req)
            .await
            .unwrap_or_else(PlugResponse::not_found)
    }
}

fn build_plugin() -> Arc<dyn Plugin> {
    Arc::new(OwncloudPlugin::default())
}

inventory::submit! {
    plugkit::Registrator { name: PLUGIN_NAME, build: build_plugin }
}
