//! Configuration system for the lamp agent
//!
//! All deployment constants (broker, pin, topics, QoS, protocol variant) live in
//! one TOML file loaded at startup. Only `[agent].id` and `[mqtt].broker_url`
//! are required; everything else defaults to the stock bedroom lamp setup.

use crate::protocol::{ProtocolVariant, TopicSet, VariantProfile};
use rumqttc::QoS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub mqtt: MqttSection,
    #[serde(default)]
    pub gpio: GpioSection,
    #[serde(default)]
    pub lamp: LampSection,
}

/// Agent identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Agent identifier (must match [a-zA-Z0-9._-]+), used as the MQTT client id
    pub id: String,
}

/// MQTT broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// MQTT broker URL with protocol and port
    pub broker_url: String,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
    /// QoS used for every publish and subscription
    #[serde(default)]
    pub qos: u8,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_keep_alive() -> u64 {
    60
}

/// GPIO backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    /// Raspberry Pi hardware via rppal
    #[default]
    Rppal,
    /// Simulated in-memory pin
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpioSection {
    /// BCM pin number driving the relay
    #[serde(default = "default_pin")]
    pub pin: u8,
    #[serde(default)]
    pub backend: GpioBackend,
}

fn default_pin() -> u8 {
    24
}

impl Default for GpioSection {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            backend: GpioBackend::default(),
        }
    }
}

/// Lamp protocol and topic layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LampSection {
    #[serde(default)]
    pub protocol: ProtocolVariant,
    #[serde(default = "default_topic_base")]
    pub topic_base: String,
    /// Full topic name overrides
    pub set_topic: Option<String>,
    pub get_topic: Option<String>,
    pub report_topic: Option<String>,
    pub online_topic: Option<String>,
    /// Behaviour overrides
    pub retain_report: Option<bool>,
    pub echo_after_set: Option<bool>,
    /// Publish a retained "false" on the online topic before a clean disconnect
    #[serde(default = "default_true")]
    pub announce_offline_on_shutdown: bool,
}

fn default_topic_base() -> String {
    "bedroom/lamp".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LampSection {
    fn default() -> Self {
        Self {
            protocol: ProtocolVariant::default(),
            topic_base: default_topic_base(),
            set_topic: None,
            get_topic: None,
            report_topic: None,
            online_topic: None,
            retain_report: None,
            echo_after_set: None,
            announce_offline_on_shutdown: true,
        }
    }
}

impl LampSection {
    /// Variant defaults with overrides applied
    pub fn topic_set(&self) -> TopicSet {
        let mut topics = self.protocol.default_topics(&self.topic_base);
        if let Some(set) = &self.set_topic {
            topics.set = set.clone();
        }
        if let Some(get) = &self.get_topic {
            topics.get = Some(get.clone());
        }
        if let Some(report) = &self.report_topic {
            topics.report = Some(report.clone());
        }
        if let Some(online) = &self.online_topic {
            topics.online = Some(online.clone());
        }
        topics
    }

    pub fn profile(&self) -> VariantProfile {
        let mut profile = self.protocol.profile();
        if let Some(retain) = self.retain_report {
            profile.retain_report = retain;
        }
        if let Some(echo) = self.echo_after_set {
            profile.echo_after_set = echo;
        }
        profile
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid agent ID format: {0}")]
    InvalidAgentId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_id(&self.agent.id)?;

        qos_from_level(self.mqtt.qos)?;

        if self.mqtt.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "keep_alive_secs must be greater than zero".to_string(),
            ));
        }

        self.lamp
            .topic_set()
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    pub fn qos(&self) -> Result<QoS, ConfigError> {
        qos_from_level(self.mqtt.qos)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[agent]
id = "test-lamp"

[mqtt]
broker_url = "mqtt://localhost:1883"

[gpio]
backend = "memory"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Map a numeric QoS level to the rumqttc type
pub fn qos_from_level(level: u8) -> Result<QoS, ConfigError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ConfigError::InvalidConfig(format!(
            "QoS must be 0, 1 or 2, got {other}"
        ))),
    }
}

fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    let valid_chars = agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if agent_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentId(format!(
            "Agent ID '{agent_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
