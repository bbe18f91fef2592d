// Mapping between crate message properties and lapin's BasicProperties.

use lapin::types::{AMQPValue, ByteArray, FieldArray, FieldTable, LongString, ShortString};
use lapin::BasicProperties;

use crate::broker::MessageProperties;
use crate::message::{HeaderValue, Headers};

pub fn to_basic_properties(props: &MessageProperties) -> BasicProperties {
    let mut properties = BasicProperties::default();

    if let Some(content_type) = &props.content_type {
        properties = properties.with_content_type(ShortString::from(content_type.clone()));
    }
    if let Some(content_encoding) = &props.content_encoding {
        properties = properties.with_content_encoding(ShortString::from(content_encoding.clone()));
    }
    if !props.headers.is_empty() {
        properties = properties.with_headers(to_field_table(&props.headers));
    }
    if let Some(message_id) = &props.message_id {
        properties = properties.with_message_id(ShortString::from(message_id.clone()));
    }
    if let Some(correlation_id) = &props.correlation_id {
        properties = properties.with_correlation_id(ShortString::from(correlation_id.clone()));
    }
    if let Some(reply_to) = &props.reply_to {
        properties = properties.with_reply_to(ShortString::from(reply_to.clone()));
    }
    if let Some(delivery_mode) = props.delivery_mode {
        properties = properties.with_delivery_mode(delivery_mode);
    }
    if let Some(priority) = props.priority {
        properties = properties.with_priority(priority);
    }
    if let Some(timestamp) = props.timestamp {
        properties = properties.with_timestamp(timestamp);
    }

    properties
}

pub fn from_basic_properties(props: &BasicProperties) -> MessageProperties {
    MessageProperties {
        content_type: short_string(props.content_type()),
        content_encoding: short_string(props.content_encoding()),
        headers: props.headers().as_ref().map(from_field_table).unwrap_or_default(),
        message_id: short_string(props.message_id()),
        correlation_id: short_string(props.correlation_id()),
        reply_to: short_string(props.reply_to()),
        delivery_mode: *props.delivery_mode(),
        priority: *props.priority(),
        timestamp: *props.timestamp(),
    }
}

pub fn to_field_table(headers: &Headers) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers {
        table.insert(ShortString::from(key.clone()), to_amqp_value(value));
    }
    table
}

pub fn from_field_table(table: &FieldTable) -> Headers {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), from_amqp_value(value)))
        .collect()
}

fn to_amqp_value(value: &HeaderValue) -> AMQPValue {
    match value {
        HeaderValue::Bool(b) => AMQPValue::Boolean(*b),
        HeaderValue::Int(i) => AMQPValue::LongLongInt(*i),
        HeaderValue::Float(f) => AMQPValue::Double(*f),
        HeaderValue::Str(s) => AMQPValue::LongString(LongString::from(s.clone())),
        HeaderValue::List(items) => AMQPValue::FieldArray(FieldArray::from(
            items.iter().map(to_amqp_value).collect::<Vec<_>>(),
        )),
        HeaderValue::Map(headers) => AMQPValue::FieldTable(to_field_table(headers)),
        HeaderValue::Bytes(bytes) => AMQPValue::ByteArray(ByteArray::from(bytes.clone())),
        HeaderValue::Null => AMQPValue::Void,
    }
}

// Integers widen to i64 and decimals become floats; everything else keeps its shape.
fn from_amqp_value(value: &AMQPValue) -> HeaderValue {
    match value {
        AMQPValue::Boolean(b) => HeaderValue::Bool(*b),
        AMQPValue::ShortShortInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::ShortShortUInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::ShortInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::ShortUInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::LongInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::LongUInt(i) => HeaderValue::Int(i64::from(*i)),
        AMQPValue::LongLongInt(i) => HeaderValue::Int(*i),
        AMQPValue::Timestamp(t) => HeaderValue::Int(i64::try_from(*t).unwrap_or(i64::MAX)),
        AMQPValue::Float(f) => HeaderValue::Float(f64::from(*f)),
        AMQPValue::Double(f) => HeaderValue::Float(*f),
        AMQPValue::DecimalValue(d) => {
            HeaderValue::Float(f64::from(d.value) / 10f64.powi(i32::from(d.scale)))
        }
        AMQPValue::ShortString(s) => HeaderValue::Str(s.as_str().to_string()),
        AMQPValue::LongString(s) => {
            HeaderValue::Str(String::from_utf8_lossy(s.as_bytes()).into_owned())
        }
        AMQPValue::FieldArray(items) => {
            HeaderValue::List(items.as_slice().iter().map(from_amqp_value).collect())
        }
        AMQPValue::FieldTable(table) => HeaderValue::Map(from_field_table(table)),
        AMQPValue::ByteArray(bytes) => HeaderValue::Bytes(bytes.as_slice().to_vec()),
        AMQPValue::Void => HeaderValue::Null,
    }
}

fn short_string(value: &Option<ShortString>) -> Option<String> {
    value.as_ref().map(|s| s.as_str().to_string())
}
