// Builds a BridgeConfig from environment variables (and a .env file, if any).

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;

use crate::config::{
    default_heartbeat, default_reply_timeout, default_timeout, BridgeConfig, ConnectionConfig,
    TemplateConfig,
};
use crate::converter::ConverterKind;
use crate::endpoint::AmqpEndpoint;
use crate::exchange::ExchangeType;

pub fn load() -> Result<BridgeConfig> {
    dotenv().ok();

    let mut endpoint = AmqpEndpoint::new(
        &env::var("AMQP_EXCHANGE").unwrap_or_default(),
        parse_var("AMQP_EXCHANGE_TYPE", ExchangeType::default())?,
        &env::var("AMQP_ROUTING_KEY").unwrap_or_default(),
    );
    endpoint.durable = parse_var("AMQP_EXCHANGE_DURABLE", true)?;

    let config = BridgeConfig {
        connection: ConnectionConfig {
            uri: env::var("AMQP_ADDR").context("AMQP_ADDR environment variable not set")?,
            connection_timeout_ms: parse_var("AMQP_CONNECT_TIMEOUT_MS", default_timeout())?,
            heartbeat_seconds: parse_var("AMQP_HEARTBEAT_SECONDS", default_heartbeat())?,
        },
        endpoint,
        template: TemplateConfig {
            reply_timeout_ms: parse_var("AMQP_REPLY_TIMEOUT_MS", default_reply_timeout())?,
            converter: parse_var("AMQP_CONVERTER", ConverterKind::default())?,
            ..TemplateConfig::default()
        },
    };

    config.validate()?;
    Ok(config)
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}
