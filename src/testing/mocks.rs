//! Mock implementations for testing
//!
//! Provides a mock [`Transport`] that records publishes, subscriptions and
//! disconnects so agent behaviour can be asserted without a broker.

use crate::agent::AgentEvent;
use crate::error::AgentError;
use crate::transport::Transport;
use async_trait::async_trait;
use rumqttc::QoS;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A message recorded by [`MockTransport::publish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Mock transport for testing
///
/// Clones share their recordings, so a test can keep one handle while the
/// lifecycle owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    pub published: Arc<Mutex<Vec<PublishedMessage>>>,
    pub subscriptions: Arc<Mutex<Vec<(String, QoS)>>>,
    pub connects: Arc<Mutex<u32>>,
    pub disconnects: Arc<Mutex<u32>>,
    pub event_sender: Arc<Mutex<Option<mpsc::UnboundedSender<AgentEvent>>>>,
    pub fail_connect: bool,
    pub fail_publish: bool,
    pub fail_subscribe: bool,
    pub fail_disconnect: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_failure() -> Self {
        Self {
            fail_connect: true,
            ..Default::default()
        }
    }

    pub fn with_publish_failure() -> Self {
        Self {
            fail_publish: true,
            ..Default::default()
        }
    }

    pub fn with_subscribe_failure() -> Self {
        Self {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    pub fn with_disconnect_failure() -> Self {
        Self {
            fail_disconnect: true,
            ..Default::default()
        }
    }

    pub async fn get_published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    /// Messages published on one topic, in order
    pub async fn get_published_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    pub async fn get_subscriptions(&self) -> Vec<(String, QoS)> {
        self.subscriptions.lock().await.clone()
    }

    pub async fn connect_count(&self) -> u32 {
        *self.connects.lock().await
    }

    pub async fn disconnect_count(&self) -> u32 {
        *self.disconnects.lock().await
    }

    /// Push an event to the agent as if it came from the broker.
    /// Returns false if the transport was never connected or the agent is gone.
    pub async fn inject(&self, event: AgentEvent) -> bool {
        let sender = self.event_sender.lock().await.clone();
        match sender {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Drop the event sender, ending the agent's event stream
    pub async fn close_events(&self) {
        self.event_sender.lock().await.take();
    }

    pub async fn clear_history(&self) {
        self.published.lock().await.clear();
        self.subscriptions.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = AgentError;

    async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<(), Self::Error> {
        if self.fail_connect {
            return Err(AgentError::internal_error("Mock connection failure"));
        }

        *self.connects.lock().await += 1;
        *self.event_sender.lock().await = Some(events);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        *self.disconnects.lock().await += 1;
        self.event_sender.lock().await.take();
        if self.fail_disconnect {
            return Err(AgentError::internal_error("Mock disconnect failure"));
        }
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), Self::Error> {
        if self.fail_publish {
            return Err(AgentError::transport(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Mock publish failure",
            )));
        }

        self.published.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        if self.fail_subscribe {
            return Err(AgentError::internal_error("Mock subscription failure"));
        }

        self.subscriptions.lock().await.push((topic.to_string(), qos));
        Ok(())
    }
}
