//! The `users` plugin: authoritative account store that announces every
//! change to its followers and rolls back creates they fail to apply.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{Account, NewAccount};

// === PLUGIN DEFINITION ===
pub mod plugin;
pub use plugin::{UsersPlugin, PLUGIN_NAME};

// === INTERNAL MODULES ===
// Exposed for tests; use `contract` and `plugin` from other crates.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
