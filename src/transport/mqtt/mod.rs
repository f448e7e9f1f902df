//! MQTT client implementation for the lamp agent
//!
//! The module separates pure functions from I/O:
//!
//! - [`connection`] - connection state, options and reconnect back-off
//! - [`message_handler`] - pure routing of rumqttc events
//! - [`client`] - the event loop supervisor and [`Transport`](crate::transport::Transport) impl
//!
//! # Usage
//!
//! ```rust,no_run
//! use lamp_agent::config::MqttSection;
//! use lamp_agent::transport::{mqtt::MqttClient, Transport};
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     username_env: None,
//!     password_env: None,
//!     qos: 0,
//!     keep_alive_secs: 60,
//! };
//!
//! let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut client = MqttClient::new("bedroom-lamp", &config, None)?;
//! client.connect(events_tx).await?;
//! while let Some(event) = events_rx.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttClient;
pub use connection::{ConnectionState, MqttError, ReconnectConfig, WillMessage};
pub use message_handler::{EventRoute, MessageHandler};
