//! Connection and message events delivered to the agent
//!
//! The MQTT client translates its callbacks into [`AgentEvent`] values, which
//! lets the connection state machine run without a broker in tests.

use bytes::Bytes;

/// Events emitted by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A (re)connection attempt is about to start
    ConnectionAttempt,
    /// Broker acknowledged the connection
    Connected { session_present: bool },
    /// Message received on a subscribed topic
    Message {
        topic: String,
        payload: Bytes,
        retain: bool,
    },
    SubscriptionConfirmed { packet_id: u16 },
    SubscriptionRejected { packet_id: u16 },
    /// An established connection dropped
    ConnectionLost(String),
    /// The client is about to retry (attempt count since the connection dropped)
    Reconnecting(u32),
}

/// Agent view of the broker link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    ConnectionLost,
    Reconnecting(u32),
    /// Shut down; no further transitions
    Closed,
}

impl LinkState {
    /// Next state after an event. Message and subscription events leave the
    /// link untouched.
    pub fn next(self, event: &AgentEvent) -> LinkState {
        if self == LinkState::Closed {
            return LinkState::Closed;
        }

        match event {
            AgentEvent::ConnectionAttempt => LinkState::Connecting,
            AgentEvent::Connected { .. } => LinkState::Connected,
            AgentEvent::ConnectionLost(_) => LinkState::ConnectionLost,
            AgentEvent::Reconnecting(attempt) => LinkState::Reconnecting(*attempt),
            AgentEvent::Message { .. }
            | AgentEvent::SubscriptionConfirmed { .. }
            | AgentEvent::SubscriptionRejected { .. } => self,
        }
    }

    pub fn is_connected(self) -> bool {
        self == LinkState::Connected
    }
}
