//! AMQP 0.9.1 broker client over `lapin`.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tracing::{debug, info, instrument, warn};

use crate::broker::{AckMode, Acker, Broker, Delivery, DeliveryStream, QueueBinding};
use crate::config::BrokerConfig;
use crate::error::BusError;

pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
    endpoint: String,
}

impl AmqpBroker {
    /// Connect, open a channel and declare the configured topic exchange.
    ///
    /// Every failure here is a fatal startup error.
    #[instrument(name = "bus.amqp.connect", skip_all, fields(endpoint = %config.endpoint()))]
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BusError> {
        let endpoint = config.endpoint();
        let connection = Connection::connect(&config.uri, ConnectionProperties::default())
            .await
            .map_err(|e| BusError::Connection {
                endpoint: endpoint.clone(),
                cause: e.to_string(),
            })?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BusError::Channel {
                cause: e.to_string(),
            })?;

        let broker = Self {
            connection,
            channel,
            endpoint,
        };
        broker.declare_topic_exchange(&config.exchange).await?;
        info!(exchange = %config.exchange, "connected to broker");
        Ok(broker)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

struct AmqpAcker(lapin::acker::Acker);

#[async_trait]
impl Acker for AmqpAcker {
    async fn ack(&self) -> Result<(), BusError> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| BusError::Ack {
                cause: e.to_string(),
            })
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn declare_topic_exchange(&self, name: &str) -> Result<(), BusError> {
        self.channel
            .exchange_declare(
                name,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Declaration {
                what: "exchange",
                name: name.to_string(),
                cause: e.to_string(),
            })
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<(), BusError> {
        let publish_err = |e: lapin::Error| BusError::Publish {
            routing_key: routing_key.to_string(),
            cause: e.to_string(),
        };
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: false,
                    immediate: false,
                },
                payload,
                BasicProperties::default().with_content_type(content_type.into()),
            )
            .await
            .map_err(publish_err)?;
        debug!(exchange, routing_key, bytes = payload.len(), "published");
        Ok(())
    }

    async fn subscribe(&self, binding: QueueBinding) -> Result<DeliveryStream, BusError> {
        // One channel per consumer keeps deliveries of different queues apart.
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| BusError::Channel {
                cause: e.to_string(),
            })?;

        let anonymous = binding.queue.is_empty();
        let queue = channel
            .queue_declare(
                &binding.queue,
                QueueDeclareOptions {
                    durable: binding.durable,
                    exclusive: anonymous,
                    auto_delete: anonymous,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Declaration {
                what: "queue",
                name: binding.queue.clone(),
                cause: e.to_string(),
            })?;
        let queue_name = queue.name().as_str().to_string();

        channel
            .queue_bind(
                &queue_name,
                &binding.exchange,
                &binding.pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Declaration {
                what: "binding",
                name: format!("{} -> {}", binding.pattern, queue_name),
                cause: e.to_string(),
            })?;

        let manual_ack = binding.ack_mode == AckMode::AfterHandle;
        let consumer = channel
            .basic_consume(
                &queue_name,
                "",
                BasicConsumeOptions {
                    no_ack: !manual_ack,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Consume {
                queue: queue_name.clone(),
                cause: e.to_string(),
            })?;

        info!(queue = %queue_name, pattern = %binding.pattern, manual_ack, "consuming");

        let stream = consumer.map(move |item| match item {
            Ok(d) => Ok(Delivery {
                routing_key: d.routing_key.as_str().to_string(),
                content_type: d
                    .properties
                    .content_type()
                    .as_ref()
                    .map(|c| c.as_str().to_string()),
                acker: if manual_ack {
                    Some(Box::new(AmqpAcker(d.acker)) as Box<dyn Acker>)
                } else {
                    None
                },
                payload: d.data,
            }),
            Err(e) => Err(BusError::Consume {
                queue: queue_name.clone(),
                cause: e.to_string(),
            }),
        });
        Ok(stream.boxed())
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    async fn close(&self) -> Result<(), BusError> {
        if let Err(e) = self.channel.close(200, "Bye").await {
            warn!(error = %e, "channel close failed");
        }
        self.connection
            .close(200, "Bye")
            .await
            .map_err(|e| BusError::Channel {
                cause: e.to_string(),
            })
    }

    fn kind(&self) -> &'static str {
        "amqp"
    }
}
