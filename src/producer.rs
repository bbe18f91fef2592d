//! Producer side of the bridge.
//!
//! [`AmqpProducer`] turns an [`Envelope`] into a broker call. Out-capable
//! envelopes go through `send_and_receive` and get their outbound slot filled;
//! everything else is a plain `send`. Before any traffic, [`AmqpProducer::start`]
//! declares the target exchange unless it is the broker's default exchange.

use std::fmt;
use std::sync::Arc;
use tracing::instrument;

use crate::adapter::AdaptedMessage;
use crate::converter::ConverterChoice;
use crate::diagnostics::{Diagnostics, Notice};
use crate::endpoint::AmqpEndpoint;
use crate::errors::{BridgeError, ProcessError, Result};
use crate::exchange::ExchangeDescriptor;
use crate::message::{Envelope, EnvelopeHead, Outbound};
use crate::template::{AmqpAdmin, AmqpTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Uninitialized,
    Declaring,
    Ready,
    Stopped,
}

impl fmt::Display for ProducerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProducerState::Uninitialized => "uninitialized",
            ProducerState::Declaring => "declaring",
            ProducerState::Ready => "ready",
            ProducerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct AmqpProducer {
    endpoint: AmqpEndpoint,
    template: Arc<dyn AmqpTemplate>,
    admin: Arc<dyn AmqpAdmin>,
    diagnostics: Arc<dyn Diagnostics>,
    exchange: Option<ExchangeDescriptor>,
    state: ProducerState,
}

impl AmqpProducer {
    pub fn new(
        endpoint: AmqpEndpoint,
        template: Arc<dyn AmqpTemplate>,
        admin: Arc<dyn AmqpAdmin>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            endpoint,
            template,
            admin,
            diagnostics,
            exchange: None,
            state: ProducerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    pub fn endpoint(&self) -> &AmqpEndpoint {
        &self.endpoint
    }

    /// The declared exchange, present while the producer is ready.
    pub fn exchange(&self) -> Option<&ExchangeDescriptor> {
        self.exchange.as_ref()
    }

    /// Provisions the target exchange. A failed declaration leaves the
    /// producer uninitialized.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == ProducerState::Ready {
            return Ok(());
        }

        self.state = ProducerState::Declaring;
        let exchange = self.endpoint.create_exchange();

        if exchange.is_default() {
            self.diagnostics.notice(Notice::UsingDefaultExchange);
        } else if let Err(e) = self.admin.declare_exchange(&exchange).await {
            self.state = ProducerState::Uninitialized;
            return Err(BridgeError::Declaration(e));
        } else {
            self.diagnostics.notice(Notice::ExchangeDeclared {
                name: exchange.name.clone(),
            });
        }

        self.exchange = Some(exchange);
        self.state = ProducerState::Ready;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.exchange = None;
        self.state = ProducerState::Stopped;
    }

    /// Sends the envelope's inbound message and returns the updated envelope.
    ///
    /// Collaborator errors are returned as they were raised, together with the
    /// envelope so the caller still owns the message.
    #[instrument(skip_all, fields(envelope_id = %envelope.id(), pattern = %envelope.pattern()))]
    pub async fn process(
        &self,
        envelope: Envelope,
    ) -> std::result::Result<Envelope, ProcessError> {
        if self.state != ProducerState::Ready {
            return Err(ProcessError::new(envelope, BridgeError::NotReady(self.state)));
        }

        let (head, inbound) = envelope.into_parts();
        let message = match AdaptedMessage::wrap(inbound) {
            Ok(message) => message,
            Err(error) => return Err(ProcessError::new(head.restore(None), error)),
        };

        match self.dispatch(&head, &message).await {
            Ok(outbound) => Ok(head.assemble(message.into_message(), outbound)),
            Err(error) => Err(ProcessError::new(
                head.restore(Some(message.into_message())),
                error,
            )),
        }
    }

    async fn dispatch(
        &self,
        head: &EnvelopeHead,
        message: &AdaptedMessage,
    ) -> Result<Option<Outbound>> {
        let choice = ConverterChoice::select(self.template.as_ref());
        if choice.is_fallback() {
            self.diagnostics
                .notice(Notice::FallbackConverter { envelope_id: head.id });
        }
        let converter = choice.converter();

        let exchange_name = self.endpoint.exchange_name.as_str();
        let routing_key = self.endpoint.routing_key.as_str();

        if !head.pattern.is_out_capable() {
            self.diagnostics.notice(Notice::Send {
                envelope_id: head.id,
                exchange: exchange_name.to_string(),
            });
            let request = message.to_broker_message(converter)?;
            self.template
                .send(exchange_name, routing_key, request)
                .await?;
            return Ok(None);
        }

        self.diagnostics.notice(Notice::SendAndReceive {
            envelope_id: head.id,
            exchange: exchange_name.to_string(),
        });
        let request = message.to_broker_message(converter)?;
        let response = self
            .template
            .send_and_receive(exchange_name, routing_key, request)
            .await?;

        match response {
            Some(reply) => {
                let reply = AdaptedMessage::from_broker_message(converter, &reply)?;
                Ok(Some(Outbound::Reply(reply.into_message())))
            }
            None => {
                self.diagnostics
                    .notice(Notice::NoReply { envelope_id: head.id });
                Ok(Some(Outbound::NoReply))
            }
        }
    }
}
