//! Translation between generic message bodies and broker payloads.
//!
//! A template may expose its own converter; when it does not, callers fall
//! back to [`SimpleMessageConverter`] through [`ConverterChoice::select`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::broker::{
    BrokerMessage, MessageProperties, CONTENT_TYPE_BYTES, CONTENT_TYPE_JSON,
    CONTENT_TYPE_TEXT_PLAIN, DEFAULT_CHARSET,
};
use crate::errors::ConversionError;
use crate::message::Body;
use crate::template::AmqpTemplate;

pub trait MessageConverter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Encode `body` into a broker message, filling in content metadata on
    /// top of the given properties.
    fn to_message(
        &self,
        body: &Body,
        properties: MessageProperties,
    ) -> Result<BrokerMessage, ConversionError>;

    fn from_message(&self, message: &BrokerMessage) -> Result<Body, ConversionError>;
}

/// Handles text, raw bytes and empty bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMessageConverter;

impl MessageConverter for SimpleMessageConverter {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn to_message(
        &self,
        body: &Body,
        mut properties: MessageProperties,
    ) -> Result<BrokerMessage, ConversionError> {
        let payload = match body {
            Body::Empty => Vec::new(),
            Body::Text(text) => {
                properties.content_type = Some(CONTENT_TYPE_TEXT_PLAIN.to_string());
                properties.content_encoding = Some(DEFAULT_CHARSET.to_string());
                text.as_bytes().to_vec()
            }
            Body::Bytes(bytes) => {
                properties.content_type = Some(CONTENT_TYPE_BYTES.to_string());
                bytes.clone()
            }
            Body::Json(_) => {
                return Err(ConversionError::UnsupportedBody {
                    converter: self.name(),
                    body: body.kind(),
                })
            }
        };

        Ok(BrokerMessage::new(payload, properties))
    }

    fn from_message(&self, message: &BrokerMessage) -> Result<Body, ConversionError> {
        let content_type = match message.content_type() {
            Some(content_type) => content_type,
            None if message.body.is_empty() => return Ok(Body::Empty),
            None => return Ok(Body::Bytes(message.body.clone())),
        };

        if !content_type.starts_with("text") {
            return Ok(Body::Bytes(message.body.clone()));
        }

        let charset = message
            .properties
            .content_encoding
            .as_deref()
            .or_else(|| charset_param(content_type))
            .unwrap_or(DEFAULT_CHARSET);

        if !is_utf8(charset) {
            return Err(ConversionError::UnsupportedEncoding(charset.to_string()));
        }

        Ok(Body::Text(String::from_utf8(message.body.clone())?))
    }
}

/// Encodes JSON bodies; anything else goes through [`SimpleMessageConverter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageConverter;

impl MessageConverter for JsonMessageConverter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn to_message(
        &self,
        body: &Body,
        mut properties: MessageProperties,
    ) -> Result<BrokerMessage, ConversionError> {
        match body {
            Body::Json(value) => {
                let payload = serde_json::to_vec(value)?;
                properties.content_type = Some(CONTENT_TYPE_JSON.to_string());
                properties.content_encoding = Some(DEFAULT_CHARSET.to_string());
                Ok(BrokerMessage::new(payload, properties))
            }
            other => SimpleMessageConverter.to_message(other, properties),
        }
    }

    fn from_message(&self, message: &BrokerMessage) -> Result<Body, ConversionError> {
        match message.content_type() {
            Some(content_type) if content_type.contains("json") => {
                Ok(Body::Json(serde_json::from_slice(&message.body)?))
            }
            _ => SimpleMessageConverter.from_message(message),
        }
    }
}

/// Converter configured on a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    #[default]
    Simple,
    Json,
}

impl ConverterKind {
    pub fn build(self) -> Arc<dyn MessageConverter> {
        match self {
            ConverterKind::Simple => Arc::new(SimpleMessageConverter),
            ConverterKind::Json => Arc::new(JsonMessageConverter),
        }
    }
}

impl std::str::FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(ConverterKind::Simple),
            "json" => Ok(ConverterKind::Json),
            other => Err(format!("Unknown converter: {}", other)),
        }
    }
}

/// Converter resolved for a single call.
pub enum ConverterChoice<'a> {
    /// Supplied by the template.
    Native(&'a dyn MessageConverter),
    /// The template exposes none.
    Fallback(SimpleMessageConverter),
}

impl<'a> ConverterChoice<'a> {
    pub fn select(template: &'a dyn AmqpTemplate) -> Self {
        match template.message_converter() {
            Some(converter) => ConverterChoice::Native(converter),
            None => ConverterChoice::Fallback(SimpleMessageConverter),
        }
    }

    pub fn converter(&self) -> &dyn MessageConverter {
        match self {
            ConverterChoice::Native(converter) => *converter,
            ConverterChoice::Fallback(converter) => converter,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ConverterChoice::Fallback(_))
    }
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().strip_prefix("charset="))
        .map(|charset| charset.trim_matches('"'))
        .next()
}

fn is_utf8(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8")
}
