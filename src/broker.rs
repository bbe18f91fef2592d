use crate::message::Headers;

pub const CONTENT_TYPE_TEXT_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE_BYTES: &str = "application/octet-stream";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// AMQP message properties, independent of the client library.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: Headers,
    pub message_id: Option<String>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub timestamp: Option<u64>,
}

/// A message as it travels to and from the broker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrokerMessage {
    pub body: Vec<u8>,
    pub properties: MessageProperties,
}

impl BrokerMessage {
    pub fn new(body: impl Into<Vec<u8>>, properties: MessageProperties) -> Self {
        BrokerMessage {
            body: body.into(),
            properties,
        }
    }

    /// A plain UTF-8 text message, as most repliers send.
    pub fn text(body: &str) -> Self {
        BrokerMessage {
            body: body.as_bytes().to_vec(),
            properties: MessageProperties {
                content_type: Some(CONTENT_TYPE_TEXT_PLAIN.to_string()),
                content_encoding: Some(DEFAULT_CHARSET.to_string()),
                ..MessageProperties::default()
            },
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.properties.content_type.as_deref()
    }
}
