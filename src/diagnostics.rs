//! Notices the producer reports while it works.
//!
//! The producer never logs directly; it hands a [`Notice`] to the injected
//! [`Diagnostics`] sink. [`TracingDiagnostics`] is the production sink.

use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::inmemory::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The template exposes no converter; the simple converter is used.
    FallbackConverter { envelope_id: Uuid },
    SendAndReceive { envelope_id: Uuid, exchange: String },
    Send { envelope_id: Uuid, exchange: String },
    /// A request-reply call returned without a reply.
    NoReply { envelope_id: Uuid },
    UsingDefaultExchange,
    ExchangeDeclared { name: String },
}

pub trait Diagnostics: Send + Sync {
    fn notice(&self, notice: Notice);
}

/// Forwards notices to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn notice(&self, notice: Notice) {
        match notice {
            Notice::FallbackConverter { envelope_id } => warn!(
                envelope_id = %envelope_id,
                "Cannot find RabbitMQ AMQP template converter, falling back to simple message converter"
            ),
            Notice::SendAndReceive { envelope_id, exchange } => debug!(
                envelope_id = %envelope_id,
                exchange = %exchange,
                "Synchronous send and request"
            ),
            Notice::Send { envelope_id, exchange } => debug!(
                envelope_id = %envelope_id,
                exchange = %exchange,
                "Synchronous send"
            ),
            Notice::NoReply { envelope_id } => debug!(
                envelope_id = %envelope_id,
                "Request completed without a reply"
            ),
            Notice::UsingDefaultExchange => info!("Using default exchange"),
            Notice::ExchangeDeclared { name } => info!("Declared exchange {}", name),
        }
    }
}

/// Keeps every notice in memory. Useful in tests.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn count(&self, predicate: impl Fn(&Notice) -> bool) -> usize {
        self.notices().iter().filter(|notice| predicate(notice)).count()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn notice(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }
}
