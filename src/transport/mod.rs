//! Transport layer for lamp control traffic
//!
//! This module provides the transport abstraction the agent is written
//! against and its MQTT implementation.

use crate::agent::AgentEvent;
use rumqttc::QoS;
use tokio::sync::mpsc;

pub mod mqtt;

/// Transport trait for agent communication
///
/// Abstracts the MQTT client so the agent can be driven by a mock in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connect to the broker. Connection, message and subscription events are
    /// delivered on `events` until the transport is disconnected.
    ///
    /// The channel is unbounded: the event loop that reads the socket also
    /// drains outgoing publishes, so it must never wait on the agent.
    async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<(), Self::Error>;

    /// Disconnect from the broker
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Publish a payload, returning once the client has accepted it
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), Self::Error>;

    /// Subscribe to an exact topic
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), Self::Error>;
}
