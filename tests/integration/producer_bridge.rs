use std::sync::Arc;

use rabbit_bridge::converter::ConverterKind;
use rabbit_bridge::diagnostics::{Notice, RecordingDiagnostics};
use rabbit_bridge::exchange::ExchangeType;
use rabbit_bridge::inmemory::{InMemoryAdmin, InMemoryTemplate};
use rabbit_bridge::{
    AmqpEndpoint, AmqpProducer, Body, BrokerMessage, Envelope, HeaderValue, Message, Outbound,
    ProducerState,
};
use serde_json::json;

struct Harness {
    producer: AmqpProducer,
    template: Arc<InMemoryTemplate>,
    admin: Arc<InMemoryAdmin>,
    diagnostics: Arc<RecordingDiagnostics>,
}

fn harness(endpoint: AmqpEndpoint, template: InMemoryTemplate) -> Harness {
    let template = Arc::new(template);
    let admin = Arc::new(InMemoryAdmin::new());
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let producer = AmqpProducer::new(
        endpoint,
        template.clone(),
        admin.clone(),
        diagnostics.clone(),
    );
    Harness {
        producer,
        template,
        admin,
        diagnostics,
    }
}

async fn started(template: InMemoryTemplate) -> Harness {
    let mut harness = harness(AmqpEndpoint::new("ex1", ExchangeType::Direct, "rk1"), template);
    harness.producer.start().await.unwrap();
    harness
}

fn is_fallback(notice: &Notice) -> bool {
    matches!(notice, Notice::FallbackConverter { .. })
}

#[tokio::test]
async fn request_reply_fills_outbound_with_reply() {
    let h = started(InMemoryTemplate::new()).await;
    h.template.reply_with(BrokerMessage::text("pong"));

    let envelope = h
        .producer
        .process(Envelope::in_out(Message::new("ping")))
        .await
        .unwrap();

    assert_eq!(envelope.reply().unwrap().body, Body::Text("pong".into()));
    assert!(h.template.sent().is_empty());

    let requests = h.template.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].exchange, "ex1");
    assert_eq!(requests[0].routing_key, "rk1");
    assert_eq!(requests[0].message.body, b"ping");
}

#[tokio::test]
async fn one_way_sends_once_and_leaves_outbound_unset() {
    let h = started(InMemoryTemplate::new()).await;

    let envelope = h
        .producer
        .process(Envelope::in_only(Message::new("event")))
        .await
        .unwrap();

    assert!(envelope.outbound().is_none());
    assert!(h.template.requests().is_empty());

    let sent = h.template.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].exchange, "ex1");
    assert_eq!(sent[0].routing_key, "rk1");
    assert_eq!(sent[0].message.body, b"event");
}

#[tokio::test]
async fn absent_reply_is_recorded_as_no_reply() {
    let h = started(InMemoryTemplate::new()).await;
    h.template.reply_with_nothing();

    let envelope = h
        .producer
        .process(Envelope::in_out(Message::new("ping")))
        .await
        .unwrap();

    assert_eq!(envelope.outbound(), Some(&Outbound::NoReply));
    assert!(envelope.reply().is_none());
    assert_eq!(
        h.diagnostics
            .count(|n| matches!(n, Notice::NoReply { envelope_id } if *envelope_id == envelope.id())),
        1
    );
}

#[tokio::test]
async fn fallback_converter_is_noticed_once_per_call() {
    let h = started(InMemoryTemplate::new()).await;

    for body in ["a", "b", "c"] {
        h.producer
            .process(Envelope::in_only(Message::new(body)))
            .await
            .unwrap();
    }

    assert_eq!(h.diagnostics.count(is_fallback), 3);
    assert_eq!(h.template.sent().len(), 3);
}

#[tokio::test]
async fn native_converter_is_used_without_notice() {
    let h = started(InMemoryTemplate::with_converter(ConverterKind::Json)).await;
    h.template.reply_with({
        let mut reply = BrokerMessage::new(
            br#"{"status":"ok"}"#.to_vec(),
            Default::default(),
        );
        reply.properties.content_type = Some("application/json".into());
        reply
    });

    let envelope = h
        .producer
        .process(Envelope::in_out(Message::new(json!({"order": 42}))))
        .await
        .unwrap();

    assert_eq!(h.diagnostics.count(is_fallback), 0);
    assert_eq!(
        h.template.requests()[0].message.properties.content_type.as_deref(),
        Some("application/json")
    );
    assert_eq!(envelope.reply().unwrap().body, Body::Json(json!({"status": "ok"})));
}

#[tokio::test]
async fn fallback_converter_rejects_json_body() {
    let h = started(InMemoryTemplate::new()).await;

    let err = h
        .producer
        .process(Envelope::in_only(Message::new(json!({"order": 42}))))
        .await
        .unwrap_err();

    assert!(matches!(err.error, rabbit_bridge::BridgeError::Conversion(_)));
    assert_eq!(
        err.envelope.inbound().unwrap().body,
        Body::Json(json!({"order": 42}))
    );
    assert!(h.template.calls().is_empty());
}

#[tokio::test]
async fn inbound_is_replaced_by_adapted_message() {
    let h = started(InMemoryTemplate::new()).await;
    let inbound = Message::new("event").with_header("tenant", "acme");

    let original = Envelope::in_only(inbound.clone());
    let original_id = original.id();
    let envelope = h.producer.process(original).await.unwrap();

    let adapted = envelope.inbound().unwrap();
    assert_eq!(envelope.id(), original_id);
    assert_eq!(adapted.body, inbound.body);
    assert_eq!(adapted.headers, inbound.headers);
    assert_eq!(adapted.header("tenant"), Some(&HeaderValue::Str("acme".into())));
    assert!(adapted.message_id.is_some());
    assert_eq!(
        h.template.sent()[0].message.properties.message_id,
        adapted.message_id
    );
}

#[tokio::test]
async fn default_exchange_skips_declaration() {
    let mut h = harness(
        AmqpEndpoint::new("", ExchangeType::Direct, "work_queue"),
        InMemoryTemplate::new(),
    );

    h.producer.start().await.unwrap();

    assert_eq!(h.producer.state(), ProducerState::Ready);
    assert!(h.admin.declared().is_empty());
    assert_eq!(h.diagnostics.notices(), vec![Notice::UsingDefaultExchange]);

    h.producer
        .process(Envelope::in_only(Message::new("job")))
        .await
        .unwrap();
    let sent = h.template.sent();
    assert_eq!(sent[0].exchange, "");
    assert_eq!(sent[0].routing_key, "work_queue");
}

#[tokio::test]
async fn malformed_exchange_fails_start() {
    let mut h = harness(
        AmqpEndpoint::new("not valid!", ExchangeType::Direct, "rk1"),
        InMemoryTemplate::new(),
    );

    let err = h.producer.start().await.unwrap_err();

    assert!(matches!(err, rabbit_bridge::BridgeError::Declaration(_)));
    assert_ne!(h.producer.state(), ProducerState::Ready);
    assert!(h.admin.declared().is_empty());
}

#[tokio::test]
async fn start_is_idempotent_once_ready() {
    let mut h = harness(
        AmqpEndpoint::new("ex1", ExchangeType::Fanout, "rk1"),
        InMemoryTemplate::new(),
    );

    h.producer.start().await.unwrap();
    h.producer.start().await.unwrap();

    assert_eq!(h.admin.declared().len(), 1);
    assert_eq!(h.producer.exchange().unwrap().kind, ExchangeType::Fanout);
}

#[tokio::test]
async fn concurrent_calls_share_one_producer() {
    let h = started(InMemoryTemplate::new()).await;
    let producer = Arc::new(h.producer);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let producer = producer.clone();
            tokio::spawn(async move {
                producer
                    .process(Envelope::in_only(Message::new(format!("event-{i}"))))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.template.sent().len(), 8);
    assert_eq!(h.diagnostics.count(is_fallback), 8);
}
