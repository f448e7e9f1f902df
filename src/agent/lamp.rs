//! Lamp agent: translates control messages into pin writes and pin reads
//! into state reports.

use super::dispatch::{ControlAction, Dispatcher};
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::gpio::{LampPin, PinState};
use crate::protocol::{online_payload, TopicSet, VariantProfile};
use crate::transport::Transport;
use rumqttc::QoS;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The lamp agent
///
/// The pin sits behind an async mutex that is held across every
/// read-then-publish sequence, so a report can never interleave with a
/// concurrent set command.
pub struct LampAgent<P: LampPin> {
    pin: Arc<Mutex<P>>,
    topics: TopicSet,
    profile: VariantProfile,
    qos: QoS,
    dispatcher: Dispatcher,
}

impl<P: LampPin> LampAgent<P> {
    /// Configure `pin` as an output and build the agent around it
    pub fn new(
        mut pin: P,
        topics: TopicSet,
        profile: VariantProfile,
        qos: QoS,
    ) -> AgentResult<Self> {
        pin.set_output()?;
        info!(pin = pin.number(), set_topic = %topics.set, "Lamp pin ready");
        let dispatcher = Dispatcher::new(&topics);

        Ok(Self {
            pin: Arc::new(Mutex::new(pin)),
            topics,
            profile,
            qos,
            dispatcher,
        })
    }

    pub fn from_config(pin: P, config: &AgentConfig) -> AgentResult<Self> {
        Self::new(
            pin,
            config.lamp.topic_set(),
            config.lamp.profile(),
            config.qos()?,
        )
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    pub fn profile(&self) -> &VariantProfile {
        &self.profile
    }

    pub async fn current_state(&self) -> AgentResult<PinState> {
        Ok(self.pin.lock().await.read_state()?)
    }

    /// Runs on every successful (re)connection: announce liveness, report the
    /// current state, then subscribe to the control topics.
    pub async fn on_connect<T: Transport>(&self, transport: &T) -> AgentResult<()> {
        if self.topics.online.is_some() {
            tolerate(
                self.publish_online(transport, true).await,
                "Online announcement",
            )?;
        }

        tolerate(
            self.publish_state(transport).await.map(|_| ()),
            "State publish",
        )?;

        for topic in self.topics.subscriptions() {
            info!("Subscribing to {}", topic);
            transport
                .subscribe(topic, self.qos)
                .await
                .map_err(|e| AgentError::subscription_failed(topic, e))?;
        }
        info!("Subscribed");

        Ok(())
    }

    /// Route an inbound message to its handler
    pub async fn handle_message<T: Transport>(
        &self,
        transport: &T,
        topic: &str,
        payload: &[u8],
    ) -> AgentResult<()> {
        match self.dispatcher.route(topic) {
            Some(ControlAction::SetState) => self.handle_set(transport, payload).await,
            Some(ControlAction::GetState) => self.handle_get(transport).await.map(|_| ()),
            None => {
                debug!("Ignoring message on unhandled topic {}", topic);
                Ok(())
            }
        }
    }

    /// Apply a set-state command. Undecodable payloads are logged and dropped.
    pub async fn handle_set<T: Transport>(&self, transport: &T, payload: &[u8]) -> AgentResult<()> {
        let state = match self.profile.command_format.decode_command(payload) {
            Ok(state) => state,
            Err(e) => {
                warn!(topic = %self.topics.set, "{}", e);
                return Ok(());
            }
        };

        info!("Message received on topic {}: {}", self.topics.set, state);

        let mut pin = self.pin.lock().await;
        pin.apply(state)?;

        if self.profile.echo_after_set {
            self.publish_locked(&*pin, transport).await?;
        }

        Ok(())
    }

    /// Answer a get-state request. The request payload is ignored.
    pub async fn handle_get<T: Transport>(&self, transport: &T) -> AgentResult<Option<PinState>> {
        debug!("State requested");
        self.publish_state(transport).await
    }

    /// Read the pin and publish it on the report topic.
    ///
    /// Returns `Ok(None)` when reporting is disabled.
    pub async fn publish_state<T: Transport>(
        &self,
        transport: &T,
    ) -> AgentResult<Option<PinState>> {
        let pin = self.pin.lock().await;
        self.publish_locked(&*pin, transport).await
    }

    pub async fn publish_online<T: Transport>(&self, transport: &T, online: bool) -> AgentResult<()> {
        let Some(topic) = self.topics.online.as_deref() else {
            return Ok(());
        };

        debug!(topic, "Publishing online={}", online);
        transport
            .publish(topic, self.qos, true, online_payload(online).to_vec())
            .await
            .map_err(AgentError::transport)?;
        info!("Published online={}", online);
        Ok(())
    }

    async fn publish_locked<T: Transport>(
        &self,
        pin: &P,
        transport: &T,
    ) -> AgentResult<Option<PinState>> {
        let (Some(topic), Some(format)) = (self.topics.report.as_deref(), self.profile.report_format)
        else {
            return Ok(None);
        };

        let state = pin.read_state()?;
        let retain = self.profile.retain_report;

        debug!(topic, retain, "Publishing state {}", state);
        transport
            .publish(topic, self.qos, retain, format.encode_state(state).to_vec())
            .await
            .map_err(AgentError::transport)?;
        info!("Published state {}", state);

        Ok(Some(state))
    }
}

/// Downgrade a recoverable error to a warning
fn tolerate(result: AgentResult<()>, what: &str) -> AgentResult<()> {
    match result {
        Err(e) if !e.is_fatal() => {
            warn!("{} failed: {}", what, e);
            Ok(())
        }
        other => other,
    }
}
