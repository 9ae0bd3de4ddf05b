//! The `owncloud` plugin: applies account commands to an ownCloud server
//! through its OCS provisioning API.

pub mod plugin;
pub use plugin::{OwncloudPlugin, PLUGIN_NAME};

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
