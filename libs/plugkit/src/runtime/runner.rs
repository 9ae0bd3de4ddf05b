//! Host runner.
//!
//! One base `PluginCtx` is built and reused across all phases
//! (init → bind → activate → wait → deactivate). Shutdown can be driven by OS
//! signals, an external `CancellationToken`, or an arbitrary future.

use plugkit_bus::Broker;
use plugkit_db::DbHandle;
use std::{future::Future, net::SocketAddr, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

use crate::context::{ConfigProvider, PluginCtxBuilder};
use crate::registry::PluginRegistry;
use crate::runtime::{host, shutdown};

/// How the runner decides when to stop.
pub enum ShutdownOptions {
    /// Ctrl+C / SIGTERM.
    Signals,
    /// An external token controls the lifecycle.
    Token(CancellationToken),
    /// Shut down when this future completes.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    pub config_provider: Arc<dyn ConfigProvider>,
    pub db: Option<Arc<DbHandle>>,
    pub broker: Option<Arc<dyn Broker>>,
    pub exchange: String,
    /// Plugins to host; empty means every linked plugin.
    pub plugins: Vec<String>,
    /// HTTP listen address; `None` hosts plugins without an HTTP edge.
    pub bind_addr: Option<SocketAddr>,
    pub shutdown: ShutdownOptions,
}

/// Discover the linked plugins and host them until shutdown.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let registry = PluginRegistry::discover(&opts.plugins)?;
    run_with_registry(registry, opts).await
}

pub async fn run_with_registry(registry: PluginRegistry, opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = shutdown::wait_for_shutdown().await {
                    tracing::warn!(error = %e, "shutdown: signal waiter failed; falling back to ctrl_c()");
                    let _ = tokio::signal::ctrl_c().await;
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::debug!("shutdown: external token controls lifecycle");
        }
    }

    let registry = Arc::new(registry);
    tracing::info!(plugins = ?registry.names(), "hosting plugins");

    let mut builder =
        PluginCtxBuilder::new(cancel.clone()).with_config_provider(opts.config_provider.clone());
    if let Some(db) = &opts.db {
        builder = builder.with_db(db.clone());
    }
    if let Some(broker) = &opts.broker {
        builder = builder.with_broker(broker.clone(), &opts.exchange);
    }
    let base_ctx = builder.build();

    tracing::info!("Phase: init");
    registry.run_init_phase(&base_ctx).await?;

    let listener = match opts.bind_addr {
        Some(addr) => Some(
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| anyhow::anyhow!("cannot bind {addr}: {e}"))?,
        ),
        None => None,
    };

    tracing::info!("Phase: activate");
    if let Err(e) = registry.run_activate_phase(&base_ctx).await {
        registry.run_deactivate_phase().await;
        return Err(e.into());
    }

    let server = listener.map(|l| {
        let router = host::build_router(registry.clone());
        tokio::spawn(host::serve(l, router, cancel.clone()))
    });

    cancel.cancelled().await;

    tracing::info!("Phase: deactivate");
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server exited with error"),
            Err(e) => tracing::warn!(error = %e, "HTTP server task join error"),
        }
    }
    registry.run_deactivate_phase().await;

    if let Some(broker) = &opts.broker {
        if let Err(e) = broker.close().await {
            tracing::warn!(error = %e, "broker close failed");
        }
    }
    if let Some(db) = &opts.db {
        if let Err(e) = DbHandle::clone(db).close().await {
            tracing::warn!(error = %e, "database close failed");
        }
    }
    Ok(())
}
