//! # PlugKit
//!
//! Plugin hosting for the user-sync services: discovery through `inventory`,
//! a shared `PluginCtx` (database, broker, config), the init → activate →
//! deactivate phases and an HTTP edge that forwards requests to plugins.
//!
//! ```rust,ignore
//! pub struct UsersPlugin { /* ... */ }
//!
//! #[plugkit::async_trait]
//! impl plugkit::Plugin for UsersPlugin { /* ... */ }
//!
//! plugkit::inventory::submit! {
//!     plugkit::Registrator { name: "users", build: || std::sync::Arc::new(UsersPlugin::default()) }
//! }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;
pub use inventory;

pub mod context;
pub mod contracts;
pub mod http;
pub mod lifecycle;
pub mod problem;
pub mod registry;
pub mod request;
pub mod router;
pub mod runtime;

pub use context::{ConfigProvider, PluginCtx, PluginCtxBuilder};
pub use contracts::{HealthStatus, Plugin};
pub use http::client::TracedClient;
pub use lifecycle::{Lifecycle, LifecycleError, Status, StopReason};
pub use problem::{bad_request, conflict, internal_error, not_found, Problem};
pub use registry::{PluginEntry, PluginRegistry, Registrator, RegistryError};
pub use request::{PlugRequest, PlugResponse, JSON_UTF8, TEXT_HTML_UTF8};
pub use router::RouteTable;
pub use runtime::{run, run_with_registry, RunOptions, ShutdownOptions};
