// src/template.rs
// Seams between the producer and the broker client.

use async_trait::async_trait;

use crate::broker::BrokerMessage;
use crate::converter::MessageConverter;
use crate::errors::{DeclarationError, TransportError};
use crate::exchange::ExchangeDescriptor;

/// Publish operations the producer needs from a broker client.
#[async_trait]
pub trait AmqpTemplate: Send + Sync {
    /// Fire-and-forget publish.
    async fn send(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<(), TransportError>;

    /// Publish and wait for the reply.
    ///
    /// `Ok(None)` means the call completed without a reply, e.g. because the
    /// template's reply timeout elapsed.
    async fn send_and_receive(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<Option<BrokerMessage>, TransportError>;

    /// Converter configured on this template, if it has one.
    fn message_converter(&self) -> Option<&dyn MessageConverter> {
        None
    }
}

#[async_trait]
pub trait AmqpAdmin: Send + Sync {
    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<(), DeclarationError>;
}
