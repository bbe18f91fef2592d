use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::broker::BrokerMessage;
use crate::converter::{ConverterKind, MessageConverter};
use crate::errors::{DeclarationError, TransportError};
use crate::exchange::ExchangeDescriptor;
use crate::template::{AmqpAdmin, AmqpTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Send,
    SendAndReceive,
}

/// A publish recorded by [`InMemoryTemplate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub exchange: String,
    pub routing_key: String,
    pub message: BrokerMessage,
}

/// Template that records publishes instead of talking to a broker.
///
/// Request-reply calls answer with the next scripted reply, or with no reply
/// once the script is exhausted.
#[derive(Default)]
pub struct InMemoryTemplate {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<VecDeque<Option<BrokerMessage>>>,
    failure: Mutex<Option<TransportError>>,
    converter: Option<Arc<dyn MessageConverter>>,
}

impl InMemoryTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A template exposing its own converter.
    pub fn with_converter(kind: ConverterKind) -> Self {
        Self {
            converter: Some(kind.build()),
            ..Self::default()
        }
    }

    pub fn reply_with(&self, reply: BrokerMessage) {
        lock(&self.replies).push_back(Some(reply));
    }

    pub fn reply_with_nothing(&self) {
        lock(&self.replies).push_back(None);
    }

    /// Makes the next call fail with `error`.
    pub fn fail_with(&self, error: TransportError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// One-way publishes.
    pub fn sent(&self) -> Vec<RecordedCall> {
        self.calls_of(CallKind::Send)
    }

    /// Request-reply publishes.
    pub fn requests(&self) -> Vec<RecordedCall> {
        self.calls_of(CallKind::SendAndReceive)
    }

    fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.kind == kind)
            .cloned()
            .collect()
    }

    fn record(
        &self,
        kind: CallKind,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<(), TransportError> {
        if let Some(error) = lock(&self.failure).take() {
            return Err(error);
        }

        info!(
            exchange = %exchange,
            routing_key = %routing_key,
            bytes = message.body.len(),
            "Message sent to in-memory template"
        );
        lock(&self.calls).push(RecordedCall {
            kind,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            message,
        });
        Ok(())
    }
}

#[async_trait]
impl AmqpTemplate for InMemoryTemplate {
    async fn send(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<(), TransportError> {
        self.record(CallKind::Send, exchange, routing_key, message)
    }

    async fn send_and_receive(
        &self,
        exchange: &str,
        routing_key: &str,
        message: BrokerMessage,
    ) -> Result<Option<BrokerMessage>, TransportError> {
        self.record(CallKind::SendAndReceive, exchange, routing_key, message)?;
        Ok(lock(&self.replies).pop_front().flatten())
    }

    fn message_converter(&self) -> Option<&dyn MessageConverter> {
        self.converter.as_deref()
    }
}

/// Admin that records declarations.
#[derive(Default)]
pub struct InMemoryAdmin {
    declared: Mutex<Vec<ExchangeDescriptor>>,
    failure: Mutex<Option<DeclarationError>>,
}

impl InMemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next declaration fail with `error`.
    pub fn fail_with(&self, error: DeclarationError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn declared(&self) -> Vec<ExchangeDescriptor> {
        lock(&self.declared).clone()
    }
}

#[async_trait]
impl AmqpAdmin for InMemoryAdmin {
    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<(), DeclarationError> {
        exchange.validate()?;

        if let Some(error) = lock(&self.failure).take() {
            return Err(error);
        }

        info!(exchange = %exchange.name, kind = %exchange.kind, "Exchange declared in memory");
        lock(&self.declared).push(exchange.clone());
        Ok(())
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
