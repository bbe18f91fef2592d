use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DeclarationError;
use crate::message::Headers;

/// Name of the broker's implicit default exchange.
pub const DEFAULT_EXCHANGE: &str = "";
const DEFAULT_EXCHANGE_ALIAS: &str = "amq.default";
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeType::Direct => "direct",
            ExchangeType::Fanout => "fanout",
            ExchangeType::Topic => "topic",
            ExchangeType::Headers => "headers",
        };
        f.write_str(name)
    }
}

impl FromStr for ExchangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(ExchangeType::Direct),
            "fanout" => Ok(ExchangeType::Fanout),
            "topic" => Ok(ExchangeType::Topic),
            "headers" => Ok(ExchangeType::Headers),
            other => Err(format!("Unknown exchange type: {}", other)),
        }
    }
}

/// The broker exchange a producer publishes into.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeDescriptor {
    pub name: String,
    pub kind: ExchangeType,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub arguments: Headers,
}

impl ExchangeDescriptor {
    pub fn new(name: impl Into<String>, kind: ExchangeType) -> Self {
        Self {
            name: name.into(),
            kind,
            durable: true,
            auto_delete: false,
            internal: false,
            arguments: Headers::new(),
        }
    }

    /// True for the broker-provided default exchange, which cannot be declared.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_EXCHANGE || self.name == DEFAULT_EXCHANGE_ALIAS
    }

    /// Checks the name against AMQP 0-9-1 naming rules.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.is_default() {
            return Err(DeclarationError::Malformed(
                "the default exchange cannot be declared".to_string(),
            ));
        }

        if self.name.len() > MAX_NAME_LEN {
            return Err(DeclarationError::Malformed(format!(
                "exchange name is {} bytes, limit is {}",
                self.name.len(),
                MAX_NAME_LEN
            )));
        }

        if let Some(bad) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
        {
            return Err(DeclarationError::Malformed(format!(
                "exchange name '{}' contains invalid character {:?}",
                self.name, bad
            )));
        }

        Ok(())
    }
}
