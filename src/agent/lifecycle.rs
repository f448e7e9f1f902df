//! Agent lifecycle management
//!
//! Drives the [`LampAgent`] from the transport's event stream: runs the
//! on-connect sequence on every (re)connection, dispatches control messages,
//! and performs the graceful shutdown.

use super::events::{AgentEvent, LinkState};
use super::lamp::LampAgent;
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::gpio::LampPin;
use crate::lifecycle_span;
use crate::transport::Transport;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};

/// Agent lifecycle management with dependency injection
pub struct AgentLifecycle<P, T>
where
    P: LampPin,
    T: Transport,
{
    agent: LampAgent<P>,
    transport: T,
    events_tx: Option<mpsc::UnboundedSender<AgentEvent>>,
    events_rx: mpsc::UnboundedReceiver<AgentEvent>,
    link: LinkState,
    broker_url: String,
    announce_offline: bool,
    connect_count: u32,
    shut_down: bool,
}

impl<P, T> AgentLifecycle<P, T>
where
    P: LampPin,
    T: Transport,
{
    /// Create a lifecycle around an injected pin and transport
    pub fn new(config: &AgentConfig, pin: P, transport: T) -> AgentResult<Self> {
        let agent = LampAgent::from_config(pin, config)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            agent,
            transport,
            events_tx: Some(events_tx),
            events_rx,
            link: LinkState::Disconnected,
            broker_url: config.mqtt.broker_url.clone(),
            announce_offline: config.lamp.announce_offline_on_shutdown,
            connect_count: 0,
            shut_down: false,
        })
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    /// Number of times the on-connect sequence has run
    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    /// Connect the transport. A failure here is fatal to the agent.
    pub async fn start(&mut self) -> AgentResult<()> {
        let events_tx = self
            .events_tx
            .take()
            .ok_or_else(|| AgentError::internal_error("Agent already started"))?;

        info!("Connecting to {}", self.broker_url);
        self.transport
            .connect(events_tx)
            .await
            .map_err(AgentError::transport)?;
        Ok(())
    }

    /// Apply one transport event
    pub async fn handle_event(&mut self, event: AgentEvent) -> AgentResult<()> {
        let next = self.link.next(&event);
        if next != self.link {
            debug!(from = ?self.link, to = ?next, "Link state transition");
        }
        self.link = next;

        match event {
            AgentEvent::ConnectionAttempt => {
                info!("Attempting connection..");
                Ok(())
            }
            AgentEvent::Connected { session_present } => {
                info!(session_present, "Connected to {}", self.broker_url);
                self.connect_count += 1;
                self.agent
                    .on_connect(&self.transport)
                    .instrument(lifecycle_span!(phase = "on_connect", count = self.connect_count))
                    .await
            }
            AgentEvent::Message {
                topic,
                payload,
                retain,
            } => {
                debug!(%topic, retain, "Message received");
                self.agent
                    .handle_message(&self.transport, &topic, &payload)
                    .await
            }
            AgentEvent::SubscriptionConfirmed { packet_id } => {
                debug!(packet_id, "Subscription confirmed");
                Ok(())
            }
            AgentEvent::SubscriptionRejected { packet_id } => {
                Err(AgentError::SubscriptionRejected { packet_id })
            }
            AgentEvent::ConnectionLost(reason) => {
                warn!("Connection lost: {}", reason);
                Ok(())
            }
            AgentEvent::Reconnecting(attempt) => {
                info!(attempt, "Reconnecting..");
                Ok(())
            }
        }
    }

    /// Process events until `shutdown` resolves, the event stream ends or a
    /// fatal error occurs, then shut down gracefully.
    ///
    /// Queued events are drained before the shutdown future is polled.
    pub async fn run_until<F>(&mut self, shutdown: F) -> AgentResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                biased;

                event = self.events_rx.recv() => {
                    let Some(event) = event else {
                        warn!("Transport event stream closed");
                        break Ok(());
                    };
                    if let Err(e) = self.handle_event(event).await {
                        if e.is_fatal() {
                            error!("Fatal agent error: {}", e);
                            break Err(e);
                        }
                        warn!("Event handling failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Exiting..");
                    break Ok(());
                }
            }
        };

        match (outcome, self.shutdown().await) {
            (Err(e), Err(shutdown_error)) => {
                warn!("Shutdown after fatal error failed: {}", shutdown_error);
                Err(e)
            }
            (Ok(()), shutdown) => shutdown,
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Graceful shutdown: optional offline announcement, then exactly one
    /// disconnect. Further calls do nothing.
    pub async fn shutdown(&mut self) -> AgentResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        if self.announce_offline && self.link.is_connected() {
            if let Err(e) = self.agent.publish_online(&self.transport, false).await {
                warn!("Offline announcement failed: {}", e);
            }
        }
        self.link = LinkState::Closed;

        self.transport
            .disconnect()
            .await
            .map_err(AgentError::transport)?;
        info!("Disconnected from {}", self.broker_url);
        Ok(())
    }
}
