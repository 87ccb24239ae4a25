//! Message bus transport: exchange/queue topology and consumer setup over
//! `lapin`. Grounded in spec.md §6's external-interface description — no
//! equivalent exists in the teacher, since the teacher has no bus
//! dependency; `lapin` is an ecosystem import for this requirement.

use std::time::Duration;

use discogsography_core::error::{AppError, Result};
use discogsography_core::models::EntityKind;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use tracing::{info, warn};

pub const EXCHANGE_NAME: &str = "discogsography-exchange";
/// Messages redelivered this many times (tracked via the `x-retry-count`
/// header this sink sets itself, see `bus::requeue_with_retry_count`) are
/// shunted to the dead-letter queue instead of processed again.
pub const MAX_REDELIVERIES: i32 = 5;

#[derive(Debug, Clone)]
pub struct BusConfig {
    pub amqp_url: String,
    pub prefetch: u16,
}

/// Owns the AMQP connection and channel for one sink process.
pub struct Bus {
    _connection: Connection,
    channel: Channel,
}

impl Bus {
    pub async fn connect(config: &BusConfig) -> Result<Self> {
        let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        channel
            .basic_qos(config.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        Ok(Self {
            _connection: connection,
            channel,
        })
    }

    /// Declare and bind this sink's durable queue for `kind`, then return a
    /// consumer bound under the `{type}.*` topic pattern.
    pub async fn consume(&self, sink_name: &str, kind: EntityKind) -> Result<Consumer> {
        let queue_name = format!("discogsography-{sink_name}-{kind}");
        let binding_pattern = format!("{kind}.*");

        self.channel
            .queue_declare(
                &queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        self.channel
            .queue_bind(
                &queue_name,
                EXCHANGE_NAME,
                &binding_pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        let consumer_tag = format!("{sink_name}-{kind}");
        let consumer = self
            .channel
            .basic_consume(
                &queue_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        info!(queue = %queue_name, pattern = %binding_pattern, "consumer bound");
        Ok(consumer)
    }

    /// Publish a compact change-hook message to `{type}.changes`.
    pub async fn publish_change(&self, kind: EntityKind, payload: &[u8]) -> Result<()> {
        let routing_key = format!("{kind}.changes");
        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                &routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?;
        Ok(())
    }

    /// Republish `payload` to its original routing key with an incremented
    /// retry-count header, then ack the original delivery. This is how a
    /// transient per-message failure gets a bounded number of redeliveries
    /// without relying on broker-level requeue semantics, which don't expose
    /// a redelivery count we can threshold on.
    pub async fn requeue_with_retry_count(
        &self,
        routing_key: &str,
        payload: &[u8],
        retry_count: i32,
    ) -> Result<()> {
        let mut headers = FieldTable::default();
        headers.insert("x-retry-count".into(), AMQPValue::LongInt(retry_count));
        let properties = BasicProperties::default().with_headers(headers);

        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?;
        Ok(())
    }

    pub async fn dead_letter(&self, sink_name: &str, kind: EntityKind, payload: &[u8]) -> Result<()> {
        let queue_name = format!("discogsography-{sink_name}-{kind}-dlq");
        self.channel
            .queue_declare(
                &queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AppError::BusFatal(e.to_string()))?;

        self.channel
            .basic_publish(
                "",
                &queue_name,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?
            .await
            .map_err(|e| AppError::BusTransient(e.to_string()))?;

        warn!(queue = %queue_name, "message shunted to dead-letter queue after repeated failures");
        Ok(())
    }
}

pub fn retry_count_from_headers(properties: &BasicProperties) -> i32 {
    properties
        .headers()
        .as_ref()
        .and_then(|headers| headers.inner().get("x-retry-count"))
        .and_then(|value| match value {
            AMQPValue::LongInt(n) => Some(*n),
            AMQPValue::ShortInt(n) => Some(*n as i32),
            _ => None,
        })
        .unwrap_or(0)
}

pub async fn ack(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .ack(BasicAckOptions::default())
        .await
        .map_err(|e| AppError::BusTransient(e.to_string()))
}

pub async fn nack_requeue(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .nack(BasicNackOptions {
            requeue: true,
            ..Default::default()
        })
        .await
        .map_err(|e| AppError::BusTransient(e.to_string()))
}

pub async fn soft_pause() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
