use serde::{Deserialize, Serialize};

use crate::exchange::{ExchangeDescriptor, ExchangeType, DEFAULT_EXCHANGE};
use crate::message::Headers;

/// Where a producer publishes: exchange settings plus a fixed routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmqpEndpoint {
    #[serde(default)]
    pub exchange_name: String,
    #[serde(default)]
    pub exchange_type: ExchangeType,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default = "default_durable")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub arguments: Headers,
}

fn default_durable() -> bool {
    true
}

impl Default for AmqpEndpoint {
    fn default() -> Self {
        Self {
            exchange_name: DEFAULT_EXCHANGE.to_string(),
            exchange_type: ExchangeType::default(),
            routing_key: String::new(),
            durable: default_durable(),
            auto_delete: false,
            internal: false,
            arguments: Headers::new(),
        }
    }
}

impl AmqpEndpoint {
    pub fn new(exchange_name: &str, exchange_type: ExchangeType, routing_key: &str) -> Self {
        Self {
            exchange_name: exchange_name.to_string(),
            exchange_type,
            routing_key: routing_key.to_string(),
            ..Self::default()
        }
    }

    pub fn create_exchange(&self) -> ExchangeDescriptor {
        ExchangeDescriptor {
            name: self.exchange_name.clone(),
            kind: self.exchange_type,
            durable: self.durable,
            auto_delete: self.auto_delete,
            internal: self.internal,
            arguments: self.arguments.clone(),
        }
    }

    pub fn is_using_default_exchange(&self) -> bool {
        self.create_exchange().is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_carries_endpoint_flags() {
        let mut endpoint = AmqpEndpoint::new("ex1", ExchangeType::Topic, "rk1");
        endpoint.auto_delete = true;
        endpoint.arguments.insert("alternate-exchange".into(), "ae".into());

        let exchange = endpoint.create_exchange();
        assert_eq!(exchange.name, "ex1");
        assert_eq!(exchange.kind, ExchangeType::Topic);
        assert!(exchange.durable);
        assert!(exchange.auto_delete);
        assert_eq!(exchange.arguments.len(), 1);
    }

    #[test]
    fn default_endpoint_uses_default_exchange() {
        assert!(AmqpEndpoint::default().is_using_default_exchange());
        assert!(!AmqpEndpoint::new("ex1", ExchangeType::Direct, "rk1").is_using_default_exchange());
    }

    #[test]
    fn deserializes_with_defaults() {
        let endpoint: AmqpEndpoint =
            serde_json::from_str(r#"{"exchange_name": "orders", "routing_key": "new"}"#).unwrap();
        assert_eq!(endpoint.exchange_type, ExchangeType::Direct);
        assert!(endpoint.durable);
        assert!(!endpoint.internal);
    }
}
