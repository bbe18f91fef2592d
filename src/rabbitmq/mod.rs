// src/rabbitmq/mod.rs
// RabbitMQ implementation of the template and admin seams

pub mod connection;
pub mod properties;

mod admin;
mod template;

// Re-export specific items to simplify imports elsewhere
pub use admin::RabbitAdmin;
pub use connection::ConnectionManager;
pub use template::{RabbitTemplate, DIRECT_REPLY_TO};
