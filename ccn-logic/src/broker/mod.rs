//! Thin AMQP 0.9.1 wrapper (spec §6 "Broker topology"), grounded in shape on
//! `process_pending_txs.py::make_pending_tx_queue` / `process_pending_txs`:
//! a durable topic exchange, a durable queue bound with a catch-all routing
//! key, and manual ack/nack on each delivery.

pub mod settings;

use futures::{Stream, StreamExt};
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};

pub use settings::BrokerSettings;

pub const PENDING_TX_QUEUE: &str = "pending-tx-queue";
pub const PENDING_MESSAGE_QUEUE: &str = "pending-message-queue";

/// A message pulled off a queue, carrying the means to ack or nack it.
pub struct Delivery {
    inner: lapin::message::Delivery,
}

impl Delivery {
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    pub async fn ack(&self) -> Result<(), lapin::Error> {
        self.inner.ack(BasicAckOptions::default()).await
    }

    /// `requeue = false` matches the original's pattern of letting the
    /// periodic full-table scan (spec §4.4) pick the row back up rather than
    /// looping it immediately back onto the same queue.
    pub async fn nack(&self) -> Result<(), lapin::Error> {
        self.inner
            .nack(BasicNackOptions {
                requeue: false,
                ..Default::default()
            })
            .await
    }
}

#[derive(Clone)]
pub struct BrokerClient {
    channel: Channel,
    settings: BrokerSettings,
}

impl BrokerClient {
    pub async fn connect(settings: BrokerSettings) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(
            &settings.amqp_uri(),
            ConnectionProperties::default()
                .with_executor(tokio_executor_trait::Tokio::current())
                .with_reactor(tokio_reactor_trait::Tokio),
        )
        .await?;
        let channel = connection.create_channel().await?;
        Ok(Self { channel, settings })
    }

    pub async fn declare_pending_tx_topology(&self) -> Result<(), lapin::Error> {
        self.declare_topic(&self.settings.pending_tx_exchange, PENDING_TX_QUEUE)
            .await
    }

    pub async fn declare_pending_message_topology(&self) -> Result<(), lapin::Error> {
        self.declare_topic(
            &self.settings.pending_message_exchange,
            PENDING_MESSAGE_QUEUE,
        )
        .await
    }

    async fn declare_topic(&self, exchange: &str, queue: &str) -> Result<(), lapin::Error> {
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        self.channel
            .queue_bind(
                queue,
                exchange,
                "#",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), lapin::Error> {
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default(),
            )
            .await?
            .await?;
        Ok(())
    }

    pub async fn publish_pending_message(&self, body: &[u8]) -> Result<(), lapin::Error> {
        self.publish(&self.settings.pending_message_exchange, "#", body)
            .await
    }

    pub async fn publish_pending_tx(&self, body: &[u8]) -> Result<(), lapin::Error> {
        self.publish(&self.settings.pending_tx_exchange, "#", body)
            .await
    }

    pub async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<impl Stream<Item = Result<Delivery, lapin::Error>>, lapin::Error> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(consumer.map(|item| item.map(|inner| Delivery { inner })))
    }
}
