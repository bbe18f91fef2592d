use async_trait::async_trait;
use lapin::{options::ExchangeDeclareOptions, Channel, Connection, ExchangeKind};
use tracing::info;

use super::properties::to_field_table;
use crate::errors::{DeclarationError, TransportError};
use crate::exchange::{ExchangeDescriptor, ExchangeType};
use crate::template::AmqpAdmin;

/// Declares exchanges over a dedicated channel.
pub struct RabbitAdmin {
    channel: Channel,
}

impl RabbitAdmin {
    pub async fn new(connection: &Connection) -> Result<Self, TransportError> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| TransportError::ChannelError(e.to_string()))?;
        Ok(Self { channel })
    }
}

fn exchange_kind(kind: ExchangeType) -> ExchangeKind {
    match kind {
        ExchangeType::Direct => ExchangeKind::Direct,
        ExchangeType::Fanout => ExchangeKind::Fanout,
        ExchangeType::Topic => ExchangeKind::Topic,
        ExchangeType::Headers => ExchangeKind::Headers,
    }
}

fn declare_options(exchange: &ExchangeDescriptor) -> ExchangeDeclareOptions {
    ExchangeDeclareOptions {
        durable: exchange.durable,
        auto_delete: exchange.auto_delete,
        internal: exchange.internal,
        ..ExchangeDeclareOptions::default()
    }
}

#[async_trait]
impl AmqpAdmin for RabbitAdmin {
    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<(), DeclarationError> {
        exchange.validate()?;

        self.channel
            .exchange_declare(
                &exchange.name,
                exchange_kind(exchange.kind),
                declare_options(exchange),
                to_field_table(&exchange.arguments),
            )
            .await
            .map_err(|e| DeclarationError::rejected(&exchange.name, e))?;

        info!(
            exchange = %exchange.name,
            kind = %exchange.kind,
            durable = exchange.durable,
            "Exchange declared"
        );
        Ok(())
    }
}
