//! Shared database handle for plugins.
//!
//! A single [`DbHandle`] is opened by the host at startup and handed to every
//! plugin through its context. Plugins talk to it through SeaORM.
//!
//! ```rust,no_run
//! # async fn demo() -> plugkit_db::Result<()> {
//! use plugkit_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! let conn = db.sea();
//! # let _ = conn;
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod sqlite;

pub use sqlite::{absolutize_sqlite_dsn, is_memory_dsn, MEMORY_DSN};

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, DbError>;

/// Lifetime and idle limit for the single in-memory connection. The pool
/// would otherwise recycle it and silently hand out an empty database.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unsupported database DSN: {0}")]
    UnknownDsn(String),

    #[error("invalid database DSN: {0}")]
    InvalidDsn(String),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Pool knobs applied on connect.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    /// SQLite only.
    pub busy_timeout: Option<Duration>,
    /// SQLite only: create the database file and its directories when missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            busy_timeout: Some(Duration::from_millis(5000)),
            create_sqlite_dirs: true,
        }
    }
}

/// Main handle.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials(dsn)))
        }
    }

    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        let o = connect_options(dsn, engine, &opts);
        let sea = Database::connect(o).await?;
        info!(engine = ?engine, dsn = %redact_credentials(dsn), "database connected");

        Ok(Self {
            engine,
            dsn: dsn.to_string(),
            sea,
        })
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// SeaORM connection (cheap clone of the pool handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    /// Round-trip a trivial statement.
    pub async fn ping(&self) -> Result<()> {
        self.sea.execute_unprepared("SELECT 1").await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        debug!(engine = ?self.engine, "closing database pool");
        self.sea.close().await?;
        Ok(())
    }
}

fn connect_options(dsn: &str, engine: DbEngine, opts: &ConnectOpts) -> ConnectOptions {
    let memory = engine == DbEngine::Sqlite && is_memory_dsn(dsn);
    let mut o = ConnectOptions::new(dsn.to_string());
    o.sqlx_logging(false);
    if let Some(t) = opts.acquire_timeout {
        o.acquire_timeout(t);
    }

    if memory {
        // Every pooled connection to :memory: is a separate database.
        o.max_connections(1)
            .min_connections(1)
            .max_lifetime(MEMORY_CONN_LIFETIME)
            .idle_timeout(MEMORY_CONN_LIFETIME);
    } else {
        if let Some(n) = opts.max_conns {
            o.max_connections(n);
        }
        if let Some(n) = opts.min_conns {
            o.min_connections(n);
        }
    }

    if engine == DbEngine::Sqlite && !memory {
        let busy = opts.busy_timeout.unwrap_or(Duration::from_millis(5000));
        let create = opts.create_sqlite_dirs;
        o.map_sqlx_sqlite_opts(move |s| s.create_if_missing(create).busy_timeout(busy));
    }

    o
}

/// Mask the password part of a DSN for logging.
pub fn redact_credentials(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut u) if u.password().is_some() => {
            let _ = u.set_password(Some("***"));
            u.to_string()
        }
        _ => dsn.to_string(),
    }
}
