//! AMQP delivery source
//!
//! Declares the configured queue, binds it to the exchange and consumes
//! from it with manual acknowledgment. Acks go out on the same channel that
//! delivered the message.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties, Consumer};

use super::{Delivery, DeliverySource, TransportResult};
use crate::config::{ConsumerConfig, QueueConfig, ServerConfig};

/// Reply code for a normal channel/connection close
const REPLY_SUCCESS: u16 = 200;

/// Build the broker URI from the server settings
pub fn amqp_uri(server: &ServerConfig) -> AMQPUri {
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: server.username.clone(),
                password: server.password.clone(),
            },
            host: server.host.clone(),
            port: server.port,
        },
        vhost: server.virtual_host.clone(),
        ..Default::default()
    }
}

/// Consumer on a broker queue
pub struct AmqpSource {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
    consumer_tag: String,
}

impl AmqpSource {
    /// Connect, declare and bind the queue, and start consuming
    pub async fn connect(
        server: &ServerConfig,
        queue: &QueueConfig,
        consumer: &ConsumerConfig,
    ) -> TransportResult<Self> {
        tracing::info!(
            "Connecting to server {}:{} (virtual host: {})",
            server.host,
            server.port,
            server.virtual_host
        );
        let connection =
            Connection::connect_uri(amqp_uri(server), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        if consumer.prefetch_count > 0 {
            channel
                .basic_qos(consumer.prefetch_count, BasicQosOptions::default())
                .await?;
        }

        tracing::info!(
            "Declaring queue {} (durable: {}, exclusive: {}, auto_delete: {})",
            queue.name,
            queue.durable,
            queue.exclusive,
            queue.auto_delete
        );
        channel
            .queue_declare(
                &queue.name,
                QueueDeclareOptions {
                    durable: queue.durable,
                    exclusive: queue.exclusive,
                    auto_delete: queue.auto_delete,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(
            "Binding queue {} to exchange {} using routing key {}",
            queue.name,
            queue.exchange,
            queue.routing_key
        );
        channel
            .queue_bind(
                &queue.name,
                &queue.exchange,
                &queue.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let consumer_tag = consumer.consumer_tag();
        tracing::info!("Starting consumer {}", consumer_tag);
        let consumer = channel
            .basic_consume(
                &queue.name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(Self {
            connection,
            channel,
            consumer,
            consumer_tag,
        })
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }
}

#[async_trait]
impl DeliverySource for AmqpSource {
    async fn next_delivery(&mut self) -> TransportResult<Option<Delivery>> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Delivery {
                tag: delivery.delivery_tag,
                body: Bytes::from(delivery.data),
                routing_key: delivery.routing_key.as_str().to_string(),
                redelivered: delivery.redelivered,
            })),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    async fn ack(&mut self, tag: u64) -> TransportResult<()> {
        self.channel
            .basic_ack(tag, BasicAckOptions::default())
            .await?;
        Ok(())
    }

    async fn reject(&mut self, tag: u64, requeue: bool) -> TransportResult<()> {
        self.channel
            .basic_reject(tag, BasicRejectOptions { requeue })
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        tracing::info!("Closing consumer {}", self.consumer_tag);
        self.channel.close(REPLY_SUCCESS, "Bye").await?;
        self.connection.close(REPLY_SUCCESS, "Bye").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_from_server_config() {
        let server = ServerConfig {
            host: "rabbit.internal".to_string(),
            port: 5673,
            virtual_host: "events".to_string(),
            username: "receiver".to_string(),
            password: "secret".to_string(),
        };

        let uri = amqp_uri(&server);
        assert_eq!(uri.authority.host, "rabbit.internal");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "receiver");
        assert_eq!(uri.vhost, "events");
    }

    #[test]
    fn test_default_vhost_is_root() {
        let uri = amqp_uri(&ServerConfig::default());
        assert_eq!(uri.vhost, "/");
        assert_eq!(uri.authority.port, crate::config::DEFAULT_PORT);
    }
}
