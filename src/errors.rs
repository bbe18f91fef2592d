// src/errors.rs

use lapin::Error as LapinError;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::message::Envelope;
use crate::producer::ProducerState;

/// Errors surfaced by [`crate::producer::AmqpProducer`].
///
/// Collaborator errors are carried through untouched; the bridge never retries.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid inbound message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error("Producer is not ready (state: {0})")]
    NotReady(ProducerState),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// A failed [`crate::producer::AmqpProducer::process`] call.
///
/// Carries the envelope back to the caller, inbound message included, so it
/// can be retried or dead-lettered.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ProcessError {
    pub envelope: Envelope,
    #[source]
    pub error: BridgeError,
}

impl ProcessError {
    pub fn new(envelope: Envelope, error: BridgeError) -> Self {
        Self { envelope, error }
    }

    pub fn into_parts(self) -> (Envelope, BridgeError) {
        (self.envelope, self.error)
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Converter '{converter}' does not support {body} bodies")]
    UnsupportedBody {
        converter: &'static str,
        body: &'static str,
    },

    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Message body is not valid UTF-8: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("RabbitMQ connection error: {0}")]
    ConnectionError(String),

    #[error("RabbitMQ channel error: {0}")]
    ChannelError(String),

    #[error("RabbitMQ publish error: {0}")]
    PublishError(String),

    #[error("RabbitMQ consume error: {0}")]
    ConsumeError(String),

    #[error("Connection timeout: {0}")]
    TimeoutError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Converting from lapin errors
impl From<LapinError> for TransportError {
    fn from(error: LapinError) -> Self {
        // lapin only exposes a coarse error kind, classify on the text
        let error_text = error.to_string();

        if error_text.contains("connection") {
            TransportError::ConnectionError(error_text)
        } else if error_text.contains("channel") {
            TransportError::ChannelError(error_text)
        } else if error_text.contains("publish") {
            TransportError::PublishError(error_text)
        } else if error_text.contains("consume") {
            TransportError::ConsumeError(error_text)
        } else {
            TransportError::Unknown(error_text)
        }
    }
}

impl From<Elapsed> for TransportError {
    fn from(_: Elapsed) -> Self {
        TransportError::TimeoutError("Connection timed out".to_string())
    }
}

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("Malformed exchange descriptor: {0}")]
    Malformed(String),

    #[error("Broker rejected declaration of exchange '{exchange}': {reason}")]
    Rejected { exchange: String, reason: String },
}

impl DeclarationError {
    pub fn rejected(exchange: &str, error: impl std::fmt::Display) -> Self {
        DeclarationError::Rejected {
            exchange: exchange.to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_keeps_transport_message() {
        let err: BridgeError = TransportError::PublishError("broker nacked".into()).into();
        assert_eq!(err.to_string(), "RabbitMQ publish error: broker nacked");
        assert!(matches!(err, BridgeError::Transport(TransportError::PublishError(_))));
    }

    #[test]
    fn rejected_declaration_names_the_exchange() {
        let err = DeclarationError::rejected("orders", "PRECONDITION_FAILED");
        assert_eq!(
            err.to_string(),
            "Broker rejected declaration of exchange 'orders': PRECONDITION_FAILED"
        );
    }

    #[test]
    fn not_ready_reports_state() {
        let err = BridgeError::NotReady(ProducerState::Stopped);
        assert_eq!(err.to_string(), "Producer is not ready (state: stopped)");
    }
}
