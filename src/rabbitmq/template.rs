use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions},
    publisher_confirm::Confirmation,
    types::FieldTable,
    Channel, Connection,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::properties::{from_basic_properties, to_basic_properties};
use crate::broker::BrokerMessage;
use crate::config::TemplateConfig;
use crate::converter::MessageConverter;
use crate::errors::TransportError;
use crate::template::AmqpTemplate;

/// RabbitMQ pseudo-queue for direct reply-to.
pub const DIRECT_REPLY_TO: &str = "amq.rabbitmq.reply-to";

const PERSISTENT: u8 = 2;

/// [`AmqpTemplate`] backed by a lapin connection.
///
/// One-way publishes share a single channel, in confirm mode when publisher
/// confirms are enabled. Each request-reply call opens its own channel so that
/// concurrent requests never share a direct reply-to consumer.
pub struct RabbitTemplate {
    connection: Arc<Connection>,
    channel: Channel,
    publisher_confirms: bool,
    reply_timeout: Duration,
    converter: Arc<dyn MessageConverter>,
}

impl RabbitTemplate {
    pub async fn new(
        connection: Arc<Connection>,
        config: &TemplateConfig,
    ) -> Result<Self, TransportError> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| TransportError::ChannelError(e.to_string()))?;

        if config.publisher_confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(|e| TransportError::ChannelError(format!("Failed to enable confirms: {}", e)))?;
        }

        Ok(Self {
            connection,
            channel,
            publisher_confirms: config.publisher_confirms,
            reply_timeout: config.reply_timeout(),
            converter: config.converter.build(),
        })
    }

    async fn publish(
        channel: &Channel,
        exchange: &str,
        routing_key: &str,
        mut message: BrokerMessage,
    ) -> Result<Confirmation, TransportError> {
        message.properties.delivery_mode.get_or_insert(PERSISTENT);
        if message.properties.timestamp.is_none() {
            message.properties.timestamp = publish_timestamp();
        }

        let confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &message.body,
                to_basic_properties(&message.properties),
            )
            .await
            .map_err(|e| TransportError::PublishError(e.to_string()))?;

        confirm
            .await
            .map_err(|e| TransportError::PublishError(e.to_string()))
    }

    async fn request_reply(
        &self,
        channel: &Channel,
        exchange: &str,
        routing_key: &str,
        mut message: BrokerMessage,
    ) -> Result<Option<BrokerMessage>, TransportError> {
        // Direct reply-to requires the consumer before the publish.
        let consumer = channel
            .basic_consume(
                DIRECT_REPLY_TO,
                &format!("reply-{}", Uuid::new_v4()),
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| TransportError::ConsumeError(e.to_string()))?;

        let correlation_id = Uuid::new_v4().to_string();
        message.properties.reply_to = Some(DIRECT_REPLY_TO.to_string());
        message.properties.correlation_id = Some(correlation_id.clone());

        Self::publish(channel, exchange, routing_key, message).await?;

        let mut replies = consumer.map(|delivery| {
            delivery
                .map(|delivery| BrokerMessage {
                    properties: from_basic_properties(&delivery.properties),
                    body: delivery.data,
                })
                .map_err(|e| TransportError::ConsumeError(e.to_string()))
        });

        await_reply(&mut replies, &correlation_id, self.reply_timeout).await
    }
}

// Seconds since the epoch; left unset if the clock reads before 1970.
fn publish_timestamp() -> Option<u64> {
    u64::try_from(chrono::Utc::now().timestamp()).ok()
}

/// Waits up to `reply_timeout` for the reply carrying `correlation_id`.
/// A timeout or an exhausted stream yields `Ok(None)`.
async fn await_reply<S>(
    replies: &mut S,
    correlation_id: &str,
    reply_timeout: Duration,
) -> Result<Option<BrokerMessage>, TransportError>
where
    S: Stream<Item = Result<BrokerMessage, TransportError>> + Unpin,
{
    match tokio::time::timeout(reply_timeout, next_reply(replies, correlation_id)).await {
        Ok(reply) => reply,
        Err(_) => {
            warn!(
                correlation_id = %correlation_id,
                "No reply received within {}ms",
                reply_timeout.as_millis()
            );
            Ok(None)
        }
    }
}

async fn next_reply<S>(
    replies: &mut S,
    correlation_id: &str,
) -> Result<Option<BrokerMessage>, TransportError>
where
    S: Stream<Item = Result<BrokerMessage, TransportError>> + Unpin,
{
    while let Some(reply) = replies.next().await {
        let reply = reply?;

        if reply.properties.correlation_id.as_deref() != Some(correlation_id) {
            debug!("Discarding reply with foreign correlation id");
            continue;
        }

        return Ok(Some(reply));
    }

    Ok(None)
}

#[async_trait]
impl AmqpTemplate for RabbitTemplate {
    async fn send(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<(), TransportError> {
        let confirmation = Self::publish(&self.channel, exchange, routing_key, message).await?;

        if self.publisher_confirms {
            if let Confirmation::Nack(_) = confirmation {
                return Err(TransportError::PublishError(format!(
                    "Broker nacked message for exchange '{}' with routing key '{}'",
                    exchange, routing_key
                )));
            }
        }

        debug!(
            "Published message to exchange '{}' with routing key '{}'",
            exchange, routing_key
        );
        Ok(())
    }

    async fn send_and_receive(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<Option<BrokerMessage>, TransportError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| TransportError::ChannelError(e.to_string()))?;

        let result = self
            .request_reply(&channel, exchange, routing_key, message)
            .await;

        if let Err(e) = channel.close(200, "Request completed").await {
            debug!("Failed to close reply channel: {}", e);
        }

        result
    }

    fn message_converter(&self) -> Option<&dyn MessageConverter> {
        Some(self.converter.as_ref())
    }
}
