//! Topic-exchange messaging for plugins: broker clients, wire messages,
//! a JSON publisher and a sequential consume loop.

pub mod amqp;
pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod message;
pub mod publisher;
pub mod routing;

pub use amqp::AmqpBroker;
pub use broker::{AckMode, Broker, Delivery, DeliveryStream, QueueBinding, JSON_CONTENT_TYPE};
pub use config::{BrokerConfig, DEFAULT_URI};
pub use consumer::{ConsumeSummary, Consumer, DeliveryHandler, HandlerError};
pub use error::BusError;
pub use memory::MemoryBroker;
pub use message::{Command, CommandError, CommandMethod, CommandResult};
pub use publisher::Publisher;
pub use routing::{topic_matches, RoutingKey, DEFAULT_EXCHANGE};
