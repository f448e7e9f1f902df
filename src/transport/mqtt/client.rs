//! Impure I/O operations for MQTT client
//!
//! This module handles network communication and async coordination
//! around the rumqttc event loop.

use super::connection::{
    configure_mqtt_options, ConnectionState, MqttError, ReconnectConfig, WillMessage,
};
use super::message_handler::{EventRoute, MessageHandler};
use crate::agent::AgentEvent;
use crate::config::MqttSection;
use crate::mqtt_span;
use crate::transport::Transport;
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT transport client for the lamp agent
pub struct MqttClient {
    client_id: String,
    client: AsyncClient,
    event_loop: Option<Mutex<EventLoop>>,
    event_loop_handle: Option<JoinHandle<()>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    closing: Arc<AtomicBool>,
    reconnect_config: ReconnectConfig,
}

impl MqttClient {
    pub fn new(
        client_id: &str,
        config: &MqttSection,
        will: Option<WillMessage>,
    ) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(client_id, config, will.as_ref())?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(MqttClient {
            client_id: client_id.to_string(),
            client,
            event_loop: Some(Mutex::new(event_loop)),
            event_loop_handle: None,
            state_tx,
            state_rx,
            shutdown_tx,
            closing: Arc::new(AtomicBool::new(false)),
            reconnect_config: ReconnectConfig::default(),
        })
    }

    pub fn with_reconnect_config(mut self, reconnect_config: ReconnectConfig) -> Self {
        self.reconnect_config = reconnect_config;
        self
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                match state_rx.borrow_and_update().clone() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(reason) => {
                        return Err(MqttError::ConnectionFailed(reason));
                    }
                    ConnectionState::Connecting | ConnectionState::Reconnecting(_) => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "State channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Start the event loop supervisor and wait for the first ConnAck.
    ///
    /// Failing to reach the broker here is reported as an error; once the
    /// first connection is up, drops are retried by the supervisor.
    pub async fn connect(&mut self, events: mpsc::UnboundedSender<AgentEvent>) -> Result<(), MqttError> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| MqttError::ConnectionFailed("Event loop already started".to_string()))?
            .into_inner();

        let supervisor = Supervisor {
            event_loop,
            events,
            state_tx: self.state_tx.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
            closing: self.closing.clone(),
            reconnect_config: self.reconnect_config.clone(),
        };

        let span = mqtt_span!(client_id = %self.client_id);
        self.event_loop_handle = Some(tokio::spawn(supervisor.run().instrument(span)));

        Self::wait_for_connection_confirmation(self.state_rx.clone(), CONNECT_TIMEOUT).await
    }

    /// Send DISCONNECT and stop the supervisor. Safe to call repeatedly.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        let Some(mut handle) = self.event_loop_handle.take() else {
            debug!("Disconnect requested without an active event loop");
            return Ok(());
        };

        self.closing.store(true, Ordering::SeqCst);

        let mut result = Ok(());
        if self.is_connected() {
            result = self
                .client
                .disconnect()
                .await
                .map_err(MqttError::DisconnectFailed);
        } else {
            let _ = self.shutdown_tx.send(true);
        }

        if tokio::time::timeout(DISCONNECT_FLUSH_TIMEOUT, &mut handle)
            .await
            .is_err()
        {
            warn!("MQTT event loop did not stop in time, aborting it");
            let _ = self.shutdown_tx.send(true);
            handle.abort();
        }

        let _ = self
            .state_tx
            .send(ConnectionState::Disconnected("Client disconnected".to_string()));
        result
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection_state(), ConnectionState::Connected)
    }

    fn check_connection_state(&self) -> Result<(), MqttError> {
        match self.connection_state() {
            ConnectionState::Connected => Ok(()),
            state => Err(MqttError::NotConnected { state }),
        }
    }
}

/// Owns the rumqttc event loop and turns its output into agent events
struct Supervisor {
    event_loop: EventLoop,
    events: mpsc::UnboundedSender<AgentEvent>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    closing: Arc<AtomicBool>,
    reconnect_config: ReconnectConfig,
}

impl Supervisor {
    async fn run(mut self) {
        info!("Starting MQTT event loop");
        let mut ever_connected = false;
        let mut reconnect_attempts = 0u32;

        if !self.emit(AgentEvent::ConnectionAttempt) {
            return;
        }

        loop {
            let result = tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping MQTT event loop");
                        break;
                    }
                    continue;
                }
                result = self.event_loop.poll() => result,
            };

            match result {
                Ok(event) => {
                    let route = MessageHandler::route_mqtt_event(&event);
                    match &route {
                        EventRoute::ConnectionAcknowledged { .. } => {
                            ever_connected = true;
                            reconnect_attempts = 0;
                            let _ = self.state_tx.send(ConnectionState::Connected);
                        }
                        EventRoute::DisconnectSent => {
                            info!("DISCONNECT sent, stopping MQTT event loop");
                            break;
                        }
                        EventRoute::Disconnected => {
                            warn!("Broker sent DISCONNECT");
                        }
                        _ => {}
                    }

                    if let Some(agent_event) = MessageHandler::to_agent_event(route) {
                        if !self.emit(agent_event) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    if self.closing.load(Ordering::SeqCst) {
                        debug!("Event loop error during shutdown: {}", e);
                        break;
                    }

                    if !ever_connected {
                        error!("MQTT connection failed: {}", e);
                        let _ = self
                            .state_tx
                            .send(ConnectionState::Disconnected(e.to_string()));
                        break;
                    }

                    let was_connected =
                        matches!(*self.state_tx.borrow(), ConnectionState::Connected);
                    if was_connected && !self.emit(AgentEvent::ConnectionLost(e.to_string())) {
                        break;
                    }

                    reconnect_attempts += 1;
                    let _ = self
                        .state_tx
                        .send(ConnectionState::Reconnecting(reconnect_attempts));

                    let delay_ms = self.reconnect_config.calculate_backoff_delay(reconnect_attempts);
                    debug!(attempt = reconnect_attempts, delay_ms, "Waiting before reconnect");
                    if !interruptible_sleep(self.shutdown_rx.clone(), delay_ms).await {
                        info!("Shutdown requested during reconnect back-off");
                        break;
                    }

                    if !self.emit(AgentEvent::Reconnecting(reconnect_attempts))
                        || !self.emit(AgentEvent::ConnectionAttempt)
                    {
                        break;
                    }
                }
            }
        }

        info!("MQTT event loop stopped");
    }

    /// Forward an event to the agent; false once the agent has gone away.
    /// Never waits, so polling continues while the agent is busy publishing.
    fn emit(&self, event: AgentEvent) -> bool {
        if self.events.send(event).is_err() {
            warn!("Agent event receiver dropped, stopping MQTT event loop");
            return false;
        }
        true
    }
}

/// Sleep that ends early on shutdown. Returns false if shutdown was requested.
async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay_ms: u64) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
        changed = shutdown_rx.changed() => changed.is_ok() && !*shutdown_rx.borrow(),
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&mut self, events: mpsc::UnboundedSender<AgentEvent>) -> Result<(), Self::Error> {
        MqttClient::connect(self, events).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttClient::disconnect(self).await
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), Self::Error> {
        self.check_connection_state()?;

        self.client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(|source| MqttError::PublishFailed {
                topic: topic.to_string(),
                source,
            })
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        self.check_connection_state()?;

        self.client
            .subscribe(topic, qos)
            .await
            .map_err(|source| MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source,
            })
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Async disconnect is impossible here; just stop the background task
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}
