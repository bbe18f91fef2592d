use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type Headers = BTreeMap<String, HeaderValue>;

/// A header value carried by a generic message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<HeaderValue>),
    Map(Headers),
    /// Raw bytes. Serialized as a list of numbers, so it reads back as `List`.
    Bytes(Vec<u8>),
    Null,
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<Vec<HeaderValue>> for HeaderValue {
    fn from(value: Vec<HeaderValue>) -> Self {
        HeaderValue::List(value)
    }
}

impl From<Headers> for HeaderValue {
    fn from(value: Headers) -> Self {
        HeaderValue::Map(value)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Body {
    /// Short name of the body kind, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Text(_) => "text",
            Body::Bytes(_) => "bytes",
            Body::Json(_) => "json",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(value)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

/// The routing layer's message: id, headers and body.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub message_id: Option<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Body,
}

impl Message {
    pub fn new(body: impl Into<Body>) -> Self {
        Message {
            message_id: None,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }
}

/// Whether a unit of work expects a reply.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ExchangePattern {
    InOnly,
    RobustInOnly,
    InOut,
    InOptionalOut,
    OutOnly,
    RobustOutOnly,
    OutIn,
    OutOptionalIn,
}

impl ExchangePattern {
    pub fn is_out_capable(self) -> bool {
        !matches!(self, ExchangePattern::InOnly | ExchangePattern::RobustInOnly)
    }
}

impl fmt::Display for ExchangePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ExchangePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InOnly" => Ok(ExchangePattern::InOnly),
            "RobustInOnly" => Ok(ExchangePattern::RobustInOnly),
            "InOut" => Ok(ExchangePattern::InOut),
            "InOptionalOut" => Ok(ExchangePattern::InOptionalOut),
            "OutOnly" => Ok(ExchangePattern::OutOnly),
            "RobustOutOnly" => Ok(ExchangePattern::RobustOutOnly),
            "OutIn" => Ok(ExchangePattern::OutIn),
            "OutOptionalIn" => Ok(ExchangePattern::OutOptionalIn),
            other => Err(format!("Unknown exchange pattern: {}", other)),
        }
    }
}

/// Contents of the outbound slot once a request-reply call returned.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Reply(Message),
    /// The broker call completed without a reply message.
    NoReply,
}

/// Unit of work handed to the producer by the routing layer.
#[derive(Clone, Debug)]
pub struct Envelope {
    id: Uuid,
    pattern: ExchangePattern,
    inbound: Option<Message>,
    outbound: Option<Outbound>,
}

impl Envelope {
    /// Creates a new Envelope with a generated UUID.
    pub fn new(pattern: ExchangePattern, inbound: Message) -> Self {
        Envelope {
            id: Uuid::new_v4(),
            pattern,
            inbound: Some(inbound),
            outbound: None,
        }
    }

    pub fn in_only(inbound: Message) -> Self {
        Self::new(ExchangePattern::InOnly, inbound)
    }

    pub fn in_out(inbound: Message) -> Self {
        Self::new(ExchangePattern::InOut, inbound)
    }

    /// An envelope with an empty inbound slot.
    pub fn empty(pattern: ExchangePattern) -> Self {
        Envelope {
            id: Uuid::new_v4(),
            pattern,
            inbound: None,
            outbound: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    pub fn inbound(&self) -> Option<&Message> {
        self.inbound.as_ref()
    }

    pub fn outbound(&self) -> Option<&Outbound> {
        self.outbound.as_ref()
    }

    /// The reply message, if the outbound slot holds one.
    pub fn reply(&self) -> Option<&Message> {
        match &self.outbound {
            Some(Outbound::Reply(message)) => Some(message),
            _ => None,
        }
    }

    pub(crate) fn into_parts(self) -> (EnvelopeHead, Option<Message>) {
        (
            EnvelopeHead {
                id: self.id,
                pattern: self.pattern,
                outbound: self.outbound,
            },
            self.inbound,
        )
    }
}

/// Everything but the inbound message, held while the producer works on it.
pub(crate) struct EnvelopeHead {
    pub(crate) id: Uuid,
    pub(crate) pattern: ExchangePattern,
    outbound: Option<Outbound>,
}

impl EnvelopeHead {
    pub(crate) fn assemble(self, inbound: Message, outbound: Option<Outbound>) -> Envelope {
        Envelope {
            id: self.id,
            pattern: self.pattern,
            inbound: Some(inbound),
            outbound: outbound.or(self.outbound),
        }
    }

    /// Rebuilds the envelope as it was handed in, for a failed call.
    pub(crate) fn restore(self, inbound: Option<Message>) -> Envelope {
        Envelope {
            id: self.id,
            pattern: self.pattern,
            inbound,
            outbound: self.outbound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_capable_patterns() {
        assert!(!ExchangePattern::InOnly.is_out_capable());
        assert!(!ExchangePattern::RobustInOnly.is_out_capable());
        assert!(ExchangePattern::InOut.is_out_capable());
        assert!(ExchangePattern::InOptionalOut.is_out_capable());
        assert!(ExchangePattern::OutOnly.is_out_capable());
    }

    #[test]
    fn pattern_parses_from_name() {
        assert_eq!("InOut".parse::<ExchangePattern>(), Ok(ExchangePattern::InOut));
        assert!("Sideways".parse::<ExchangePattern>().is_err());
    }

    #[test]
    fn new_envelope_has_no_outbound() {
        let envelope = Envelope::in_out(Message::new("ping"));
        assert!(envelope.outbound().is_none());
        assert!(envelope.reply().is_none());
        assert_eq!(envelope.inbound().unwrap().body, Body::Text("ping".into()));
    }

    #[test]
    fn envelopes_get_distinct_ids() {
        let a = Envelope::in_only(Message::new("a"));
        let b = Envelope::in_only(Message::new("b"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn header_values_deserialize_untagged() {
        let headers: Headers =
            serde_json::from_str(r#"{"a": "x", "b": 3, "c": true, "d": 1.5}"#).unwrap();
        assert_eq!(headers["a"], HeaderValue::Str("x".into()));
        assert_eq!(headers["b"], HeaderValue::Int(3));
        assert_eq!(headers["c"], HeaderValue::Bool(true));
        assert_eq!(headers["d"], HeaderValue::Float(1.5));
    }

    #[test]
    fn nested_header_values_deserialize() {
        let headers: Headers =
            serde_json::from_str(r#"{"e": [1, "y"], "f": {"g": null}}"#).unwrap();
        assert_eq!(
            headers["e"],
            HeaderValue::List(vec![HeaderValue::Int(1), HeaderValue::Str("y".into())])
        );
        let mut inner = Headers::new();
        inner.insert("g".into(), HeaderValue::Null);
        assert_eq!(headers["f"], HeaderValue::Map(inner));
    }
}
