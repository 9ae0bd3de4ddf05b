use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use plugkit::{RunOptions, ShutdownOptions};
use plugkit_bus::{AmqpBroker, Broker, BrokerConfig, MemoryBroker};
use plugkit_db::{ConnectOpts, DbHandle, MEMORY_DSN};
use runtime::{AppConfig, AppConfigProvider, CliArgs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Plugins register through inventory; referencing the crates keeps them linked.
use owncloud as _;
use users as _;

// Adapter to make AppConfigProvider implement plugkit::ConfigProvider
struct PluginConfigAdapter(AppConfigProvider);

impl plugkit::ConfigProvider for PluginConfigAdapter {
    fn get_plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value> {
        self.0.get_plugin_config(plugin_name)
    }
}

/// Usersync Server - keeps user accounts in sync across services
#[derive(Parser)]
#[command(name = "usersync-server")]
#[command(about = "Usersync Server - keeps user accounts in sync across services")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use in-memory database and broker
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run {
        /// Host only the named plugin (repeatable; default: all linked plugins)
        #[arg(long = "plugin")]
        plugins: Vec<String>,
    },
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Usersync Server starting");

    match cli.command.unwrap_or(Commands::Run {
        plugins: Vec::new(),
    }) {
        Commands::Run { plugins } => run_server(config, args, plugins).await,
        Commands::Check => check_config(config).await,
    }
}

async fn connect_db(config: &AppConfig, mock: bool) -> Result<Option<Arc<DbHandle>>> {
    let dsn = if mock {
        MEMORY_DSN.to_string()
    } else {
        let Some(db_config) = &config.database else {
            tracing::warn!("No database configuration found, running without database");
            return Ok(None);
        };
        let raw = db_config.url.trim();
        if raw.is_empty() {
            return Err(anyhow!("Database URL not configured"));
        }
        if raw.starts_with("sqlite://") {
            // Relative sqlite paths live under home_dir.
            plugkit_db::absolutize_sqlite_dsn(raw, Path::new(&config.server.home_dir), true)?
        } else {
            raw.to_string()
        }
    };

    let mut opts = ConnectOpts {
        acquire_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    if let Some(db_config) = &config.database {
        opts.max_conns = db_config.max_conns.or(opts.max_conns);
        if let Some(ms) = db_config.busy_timeout_ms {
            opts.busy_timeout = Some(Duration::from_millis(u64::from(ms)));
        }
    }

    let db = DbHandle::connect(&dsn, opts).await?;
    tracing::info!("Connected DB backend: {:?}", db.engine());
    Ok(Some(Arc::new(db)))
}

async fn connect_broker(config: &AppConfig, mock: bool) -> Result<(Option<Arc<dyn Broker>>, String)> {
    let section = config.broker.clone().unwrap_or_default();
    if mock {
        tracing::info!("Using in-memory broker");
        return Ok((Some(Arc::new(MemoryBroker::new())), section.exchange));
    }
    if config.broker.is_none() {
        tracing::warn!("No broker configuration found, running without broker");
        return Ok((None, section.exchange));
    }

    let broker_config = BrokerConfig::new(section.uri, section.exchange.clone());
    let broker = AmqpBroker::connect(&broker_config).await?;
    Ok((Some(Arc::new(broker)), section.exchange))
}

async fn run_server(config: AppConfig, args: CliArgs, plugins: Vec<String>) -> Result<()> {
    tracing::info!("Initializing plugins...");

    let bind_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow!("Invalid listen address: {e}"))?;

    let db = connect_db(&config, args.mock).await?;
    let (broker, exchange) = connect_broker(&config, args.mock).await?;

    let config_provider = Arc::new(PluginConfigAdapter(AppConfigProvider::new(config)));

    let run_options = RunOptions {
        config_provider,
        db,
        broker,
        exchange,
        plugins,
        bind_addr: Some(bind_addr),
        shutdown: ShutdownOptions::Signals,
    };

    plugkit::run(run_options).await
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if let Some(broker) = &config.broker {
        if broker.uri.trim().is_empty() {
            return Err(anyhow!("broker.uri is empty"));
        }
    }
    if let Some(db) = &config.database {
        DbHandle::detect(&db.url)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}
