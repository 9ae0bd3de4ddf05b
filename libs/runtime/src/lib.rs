//! Process-level runtime support: layered configuration, home directory
//! resolution and logging initialization.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, BrokerSection, CliArgs, DatabaseConfig,
    LoggingConfig, Section, ServerConfig,
};
