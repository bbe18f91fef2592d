//! Producer bridge from a generic message-exchange model onto RabbitMQ.
//!
//! [`producer::AmqpProducer`] receives [`message::Envelope`]s, shapes their
//! inbound message into a broker message through the [`adapter`] and a
//! [`converter`], and either publishes it one-way or waits for a reply,
//! depending on the envelope's [`message::ExchangePattern`]. The broker side is
//! reached through the [`template`] traits, implemented for lapin in
//! [`rabbitmq`] and in memory in [`inmemory`].

pub mod adapter;
pub mod broker;
pub mod config;
pub mod converter;
pub mod diagnostics;
pub mod endpoint;
pub mod env;
pub mod errors;
pub mod exchange;
pub mod inmemory;
pub mod logging;
pub mod message;
pub mod producer;
pub mod rabbitmq;
pub mod template;

pub use adapter::AdaptedMessage;
pub use broker::{BrokerMessage, MessageProperties};
pub use endpoint::AmqpEndpoint;
pub use errors::{BridgeError, ConversionError, DeclarationError, ProcessError, TransportError};
pub use message::{Body, Envelope, ExchangePattern, HeaderValue, Message, Outbound};
pub use producer::{AmqpProducer, ProducerState};
