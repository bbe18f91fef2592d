use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use rabbit_bridge::config::{self, CONFIG_FILE_NAME};
use rabbit_bridge::diagnostics::TracingDiagnostics;
use rabbit_bridge::logging::{init_logging, LogFormat};
use rabbit_bridge::rabbitmq::{ConnectionManager, RabbitAdmin, RabbitTemplate};
use rabbit_bridge::{AmqpProducer, Envelope, ExchangePattern, Message, Outbound};

const USAGE: &str = "Usage: rabbit_bridge [send <body> | request <body> | init-config [path]]";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LogFormat::from_env());

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("send") => run(ExchangePattern::InOnly, body_arg(&args)).await,
        Some("request") => run(ExchangePattern::InOut, body_arg(&args)).await,
        Some("init-config") => {
            let path = args
                .get(2)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            config::create_default_config_file(&path)?;
            println!("Configuration file created at: {}", path.display());
            Ok(())
        }
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn body_arg(args: &[String]) -> String {
    args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default()
}

async fn run(pattern: ExchangePattern, body: String) -> Result<()> {
    let config = config::load_config()?;

    let mut manager = ConnectionManager::from_config(&config.connection);
    let connection = manager
        .get_connection()
        .await
        .context("RabbitMQ connection failed")?;

    let template = RabbitTemplate::new(connection.clone(), &config.template)
        .await
        .context("Failed to create RabbitMQ template")?;
    let admin = RabbitAdmin::new(&connection)
        .await
        .context("Failed to create RabbitMQ admin")?;

    let mut producer = AmqpProducer::new(
        config.endpoint.clone(),
        Arc::new(template),
        Arc::new(admin),
        Arc::new(TracingDiagnostics),
    );
    producer.start().await.context("Failed to start producer")?;
    info!(
        exchange = %producer.endpoint().exchange_name,
        routing_key = %producer.endpoint().routing_key,
        "Producer ready"
    );

    let envelope = producer
        .process(Envelope::new(pattern, Message::new(body)))
        .await
        .context("Failed to process message")?;

    match envelope.outbound() {
        Some(Outbound::Reply(reply)) => {
            info!(envelope_id = %envelope.id(), "Reply received");
            match reply.body.as_text() {
                Some(text) => println!("{}", text),
                None => println!("{:?}", reply.body),
            }
        }
        Some(Outbound::NoReply) => println!("No reply received"),
        None => info!(envelope_id = %envelope.id(), "Message sent"),
    }

    producer.stop();
    manager.close().await?;
    Ok(())
}
