//! Protocol variants deployed across lamp installations
//!
//! Each variant fixes the command/report encodings, which topics exist and
//! whether reports are retained. Individual settings can still be overridden
//! from configuration.

use super::payload::PayloadFormat;
use super::topics::{join_topic, TopicSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// `setOn` JSON boolean commands, retained `on` reports, `online` marker
    #[default]
    Boolean,
    /// `setState`/`getState` word commands, non-retained `state` replies
    Word,
    /// `setState` word commands only, no reporting
    Minimal,
}

/// Behaviour knobs derived from a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    pub command_format: PayloadFormat,
    /// `None` disables state reporting entirely
    pub report_format: Option<PayloadFormat>,
    pub retain_report: bool,
    /// Publish the new state right after a set command
    pub echo_after_set: bool,
}

impl ProtocolVariant {
    pub fn profile(self) -> VariantProfile {
        match self {
            ProtocolVariant::Boolean => VariantProfile {
                command_format: PayloadFormat::Boolean,
                report_format: Some(PayloadFormat::Boolean),
                retain_report: true,
                echo_after_set: true,
            },
            ProtocolVariant::Word => VariantProfile {
                command_format: PayloadFormat::Word,
                report_format: Some(PayloadFormat::Word),
                retain_report: false,
                echo_after_set: false,
            },
            ProtocolVariant::Minimal => VariantProfile {
                command_format: PayloadFormat::Word,
                report_format: None,
                retain_report: false,
                echo_after_set: false,
            },
        }
    }

    /// Default topic layout under `base`
    pub fn default_topics(self, base: &str) -> TopicSet {
        match self {
            ProtocolVariant::Boolean => TopicSet {
                set: join_topic(base, "setOn"),
                get: None,
                report: Some(join_topic(base, "on")),
                online: Some(join_topic(base, "online")),
            },
            ProtocolVariant::Word => TopicSet {
                set: join_topic(base, "setState"),
                get: Some(join_topic(base, "getState")),
                report: Some(join_topic(base, "state")),
                online: None,
            },
            ProtocolVariant::Minimal => TopicSet {
                set: join_topic(base, "setState"),
                get: None,
                report: None,
                online: None,
            },
        }
    }
}
