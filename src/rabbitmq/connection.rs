use lapin::{Connection, ConnectionProperties};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

use crate::config::ConnectionConfig;
use crate::errors::TransportError;

/// Opens and holds the broker connection. One attempt per call, no reconnect
/// loop; a dropped connection is reopened on the next `get_connection`.
pub struct ConnectionManager {
    uri: String,
    connect_timeout: Duration,
    heartbeat_seconds: u16,
    connection: Option<Arc<Connection>>,
}

impl ConnectionManager {
    pub fn new(uri: &str) -> Self {
        ConnectionManager {
            uri: uri.to_string(),
            connect_timeout: Duration::from_millis(5000),
            heartbeat_seconds: 30,
            connection: None,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(&config.uri)
            .with_connect_timeout(Duration::from_millis(config.connection_timeout_ms))
            .with_heartbeat(config.heartbeat_seconds)
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat_seconds: u16) -> Self {
        self.heartbeat_seconds = heartbeat_seconds;
        self
    }

    pub async fn get_connection(&mut self) -> Result<Arc<Connection>, TransportError> {
        if let Some(conn) = &self.connection {
            if conn.status().connected() {
                return Ok(conn.clone());
            }
        }

        let uri = connection_uri(&self.uri, self.heartbeat_seconds);
        info!("Connecting to RabbitMQ at {}", sanitize_uri_for_logging(&self.uri));

        let conn = match timeout(
            self.connect_timeout,
            Connection::connect(&uri, ConnectionProperties::default()),
        )
        .await
        {
            Ok(Ok(conn)) => Arc::new(conn),
            Ok(Err(e)) => {
                error!("Failed to connect to RabbitMQ: {}", e);
                return Err(TransportError::ConnectionError(e.to_string()));
            }
            Err(elapsed) => {
                error!(
                    "Connection to RabbitMQ timed out after {}ms",
                    self.connect_timeout.as_millis()
                );
                return Err(elapsed.into());
            }
        };

        info!("Successfully connected to RabbitMQ");
        self.connection = Some(conn.clone());
        Ok(conn)
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(conn) = self.connection.take() {
            info!("Closing RabbitMQ connection gracefully");
            conn.close(200, "Closing connection").await?;
        }
        Ok(())
    }
}

/// Adds the heartbeat to the URI query unless the URI already sets one.
fn connection_uri(uri: &str, heartbeat_seconds: u16) -> String {
    if uri.contains("heartbeat=") {
        return uri.to_string();
    }
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}heartbeat={heartbeat_seconds}")
}

/// Masks the password in an AMQP URI.
pub fn sanitize_uri_for_logging(uri: &str) -> String {
    if let (Some(scheme_end), Some(at_pos)) = (uri.find("://"), uri.rfind('@')) {
        let credentials = &uri[scheme_end + 3..at_pos];
        if let Some(colon_pos) = credentials.find(':') {
            let username = &credentials[..colon_pos];
            return format!("{}{}:***{}", &uri[..scheme_end + 3], username, &uri[at_pos..]);
        }
    }
    uri.to_string()
}
