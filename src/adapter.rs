//! Wraps generic messages so they can be shaped into broker messages and back.

use uuid::Uuid;

use crate::broker::{BrokerMessage, MessageProperties};
use crate::converter::MessageConverter;
use crate::errors::{BridgeError, ConversionError};
use crate::message::Message;

/// A generic message normalized for the broker side.
///
/// Owns the wrapped message; the body is only copied when a broker message is
/// built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedMessage {
    message: Message,
}

impl AdaptedMessage {
    /// Fails when the inbound slot is empty. Messages without an id get one.
    pub fn wrap(message: Option<Message>) -> Result<Self, BridgeError> {
        let mut message = message
            .ok_or_else(|| BridgeError::InvalidMessage("no inbound message".to_string()))?;

        if message.message_id.is_none() {
            message.message_id = Some(Uuid::new_v4().to_string());
        }

        Ok(Self { message })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    pub fn to_broker_message(
        &self,
        converter: &dyn MessageConverter,
    ) -> Result<BrokerMessage, ConversionError> {
        let properties = MessageProperties {
            headers: self.message.headers.clone(),
            message_id: self.message.message_id.clone(),
            ..MessageProperties::default()
        };

        converter.to_message(&self.message.body, properties)
    }

    pub fn from_broker_message(
        converter: &dyn MessageConverter,
        message: &BrokerMessage,
    ) -> Result<Self, ConversionError> {
        let body = converter.from_message(message)?;

        Ok(Self {
            message: Message {
                message_id: message.properties.message_id.clone(),
                headers: message.properties.headers.clone(),
                body,
            },
        })
    }
}
