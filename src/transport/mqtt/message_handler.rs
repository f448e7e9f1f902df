//! Pure message routing and processing logic for MQTT events
//!
//! This module contains pure functions for classifying rumqttc events and
//! mapping them onto the agent's event model.

use crate::agent::AgentEvent;
use bytes::Bytes;
use rumqttc::{ConnectReturnCode, Event, Outgoing, Packet, SubscribeReasonCode};
use tracing::debug;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(connack) if connack.code == ConnectReturnCode::Success => {
                    EventRoute::ConnectionAcknowledged {
                        session_present: connack.session_present,
                    }
                }
                Packet::ConnAck(connack) => {
                    EventRoute::ConnectionRefused(format!("{:?}", connack.code))
                }
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: publish.topic.clone(),
                    payload: publish.payload.clone(),
                    retain: publish.retain,
                },
                Packet::SubAck(suback) => EventRoute::SubscriptionAcknowledged {
                    packet_id: suback.pkid,
                    accepted: Self::subscription_accepted(&suback.return_codes),
                },
                Packet::Disconnect => EventRoute::Disconnected,
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(Outgoing::Disconnect) => EventRoute::DisconnectSent,
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// A SubAck is a success only if every filter was granted
    pub fn subscription_accepted(return_codes: &[SubscribeReasonCode]) -> bool {
        return_codes
            .iter()
            .all(|code| matches!(code, SubscribeReasonCode::Success(_)))
    }

    /// Agent-facing event for a route, if the agent cares about it
    pub fn to_agent_event(route: EventRoute) -> Option<AgentEvent> {
        match route {
            EventRoute::ConnectionAcknowledged { session_present } => {
                Some(AgentEvent::Connected { session_present })
            }
            EventRoute::MessageReceived {
                topic,
                payload,
                retain,
            } => Some(AgentEvent::Message {
                topic,
                payload,
                retain,
            }),
            EventRoute::SubscriptionAcknowledged {
                packet_id,
                accepted: true,
            } => Some(AgentEvent::SubscriptionConfirmed { packet_id }),
            EventRoute::SubscriptionAcknowledged {
                packet_id,
                accepted: false,
            } => Some(AgentEvent::SubscriptionRejected { packet_id }),
            EventRoute::InfrastructureEvent(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event);
                None
            }
            EventRoute::ConnectionRefused(_)
            | EventRoute::Disconnected
            | EventRoute::DisconnectSent
            | EventRoute::OutgoingEvent => None,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish/subscribe
    ConnectionAcknowledged { session_present: bool },
    /// Broker answered the CONNECT with a refusal code
    ConnectionRefused(String),
    /// Message received on subscribed topic
    MessageReceived {
        topic: String,
        payload: Bytes,
        retain: bool,
    },
    /// SubAck received
    SubscriptionAcknowledged { packet_id: u16, accepted: bool },
    /// MQTT broker disconnected
    Disconnected,
    /// Our own DISCONNECT went out
    DisconnectSent,
    /// Infrastructure event (PingResp, PubAck, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}
