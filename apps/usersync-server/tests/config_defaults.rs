//! The app config section and the bus crate must agree on broker defaults.

use plugkit_bus::{BrokerConfig, DEFAULT_EXCHANGE, DEFAULT_URI};
use runtime::{AppConfig, BrokerSection};

#[test]
fn broker_section_defaults_match_bus_defaults() {
    let section = BrokerSection::default();
    let bus = BrokerConfig::default();

    assert_eq!(section.uri, bus.uri);
    assert_eq!(section.uri, DEFAULT_URI);
    assert_eq!(section.exchange, bus.exchange);
    assert_eq!(section.exchange, DEFAULT_EXCHANGE);
}

#[test]
fn default_app_config_carries_the_bus_defaults() {
    let broker = AppConfig::default().broker.unwrap_or_default();
    assert_eq!(broker.uri, DEFAULT_URI);
}
