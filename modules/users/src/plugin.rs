use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use plugkit::{HealthStatus, Lifecycle, PlugRequest, PlugResponse, Plugin, PluginCtx, RouteTable};
use plugkit_bus::{AckMode, Broker, Consumer, Publisher, QueueBinding, RoutingKey};
use plugkit_db::DbHandle;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::routes;
use crate::config::UsersConfig;
use crate::domain::compensator::Compensator;
use crate::domain::ports::CommandSink;
use crate::domain::service::Service;
use crate::infra::bus::{BusCommandSink, InFlight, ResultListener};
use crate::infra::storage::{migrations::Migrator, SeaOrmAccountsRepository};

pub const PLUGIN_NAME: &str = "users";

/// Everything `init` builds; swapped in once so `dispatch` never blocks.
struct Wired {
    service: Arc<Service>,
    routes: RouteTable<Service>,
    listener: Arc<ResultListener>,
    binding: QueueBinding,
    broker: Arc<dyn Broker>,
    db: Arc<DbHandle>,
    in_flight: Arc<InFlight>,
}

/// The authority: owns the account table, announces changes on
/// `<audience>.<follower_audience>` and compensates failed creates reported
/// on `*.<audience>`.
pub struct UsersPlugin {
    wired: ArcSwapOption<Wired>,
    results: Lifecycle,
}

impl Default for UsersPlugin {
    fn default() -> Self {
        Self {
            wired: ArcSwapOption::empty(),
            results: Lifecycle::new("users.results"),
        }
    }
}

impl UsersPlugin {
    /// Commands published but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.wired
            .load()
            .as_ref()
            .map(|w| w.in_flight.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Plugin for UsersPlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        info!("Initializing users plugin");
        let cfg: UsersConfig = ctx.plugin_config();
        debug!(?cfg, "loaded users config");

        let db = ctx.db_required()?;
        Migrator::up(&db.sea(), None)
            .await
            .context("users migrations failed")?;

        let broker = ctx.broker_required()?;
        broker
            .declare_topic_exchange(ctx.exchange())
            .await
            .context("cannot declare exchange")?;

        let in_flight = Arc::new(InFlight::with_max_age(Duration::from_secs(
            cfg.in_flight_max_age_secs,
        )));
        let command_key = RoutingKey::new(&cfg.audience, &cfg.follower_audience).to_string();
        let sink: Arc<dyn CommandSink> = Arc::new(BusCommandSink::new(
            Publisher::new(broker.clone(), ctx.exchange()),
            command_key,
            in_flight.clone(),
        ));

        let repo = Arc::new(SeaOrmAccountsRepository::new(db.sea()));
        let service = Arc::new(Service::new(repo.clone(), sink.clone()));

        let mut compensator = Compensator::new(repo);
        if cfg.notify_followers_on_rollback {
            compensator = compensator.notifying(sink);
        }
        let listener = Arc::new(ResultListener::new(Arc::new(compensator), in_flight.clone()));

        let ack_mode = if cfg.ack_after_handle {
            AckMode::AfterHandle
        } else {
            AckMode::OnReceipt
        };
        let binding = QueueBinding::new(ctx.exchange(), RoutingKey::audience_pattern(&cfg.audience))
            .named(&cfg.queue, cfg.durable_queue)
            .with_ack_mode(ack_mode);

        self.wired.store(Some(Arc::new(Wired {
            service,
            routes: routes::route_table()?,
            listener,
            binding,
            broker,
            db,
            in_flight,
        })));
        Ok(())
    }

    async fn activate(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let wired = self
            .wired
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("users plugin not initialized"))?;

        let consumer = Consumer::bind(wired.broker.as_ref(), wired.binding.clone())
            .await
            .context("cannot bind result queue")?;
        info!(queue = consumer.label(), pattern = %wired.binding.pattern, "waiting for plugin results");

        let listener = wired.listener.clone();
        self.results
            .start(ctx.cancellation_token().child_token(), move |cancel| async move {
                consumer.run(listener, cancel).await;
                Ok(())
            })?;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        let Some(wired) = self.wired.load_full() else {
            return HealthStatus::unhealthy("not initialized");
        };
        if !wired.broker.is_connected() {
            return HealthStatus::unhealthy("broker disconnected");
        }
        if let Err(e) = wired.db.ping().await {
            return HealthStatus::unhealthy(format!("database: {e}"));
        }
        HealthStatus::healthy()
    }

    async fn deactivate(&self) -> anyhow::Result<()> {
        let reason = self.results.stop(Duration::from_secs(5)).await;
        debug!(?reason, "result consumer stopped");
        Ok(())
    }

    async fn dispatch(&self, req: PlugRequest) -> PlugResponse {
        let Some(wired) = self.wired.load_full() else {
            return PlugResponse::not_found();
        };
        wired
            .routes
            .dispatch(&wired.service, req)
            .await
            .unwrap_or_else(PlugResponse::not_found)
    }
}

fn build_plugin() -> Arc<dyn Plugin> {
    Arc::new(UsersPlugin::default())
}

inventory::submit! {
    plugkit::Registrator { name: PLUGIN_NAME, build: build_plugin }
}
