//! Topic construction and validation for lamp control topics

use thiserror::Error;

/// Join a base path and a leaf into a topic name.
///
/// Empty segments are dropped, so `"bedroom/lamp/"` + `"/on"` and
/// `"bedroom//lamp"` + `"on"` both yield `"bedroom/lamp/on"`.
pub fn join_topic(base: &str, leaf: &str) -> String {
    base.split('/')
        .chain(leaf.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate a topic name we publish to or subscribe on.
///
/// Control topics are exact names, never filters, so wildcards are rejected.
pub fn validate_topic_name(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }

    for ch in topic.chars() {
        if ch == '+' || ch == '#' || ch == '\0' {
            return Err(ValidationError::InvalidTopicChar {
                topic: topic.to_string(),
                ch,
            });
        }
    }

    Ok(())
}

/// Topic validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Topic name cannot be empty")]
    EmptyTopic,
    #[error("Topic '{topic}' contains invalid character: {ch:?}")]
    InvalidTopicChar { topic: String, ch: char },
    #[error("Topic '{0}' is used for more than one control role")]
    DuplicateTopic(String),
}

/// Resolved topic names for one lamp, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    /// Set-state commands (subscribe)
    pub set: String,
    /// Get-state requests (subscribe)
    pub get: Option<String>,
    /// State reports (publish)
    pub report: Option<String>,
    /// Retained liveness marker and last-will (publish)
    pub online: Option<String>,
}

impl TopicSet {
    /// Topics the agent subscribes to, in subscription order
    pub fn subscriptions(&self) -> Vec<&str> {
        let mut topics = vec![self.set.as_str()];
        if let Some(get) = &self.get {
            topics.push(get.as_str());
        }
        topics
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let all: Vec<&str> = [
            Some(self.set.as_str()),
            self.get.as_deref(),
            self.report.as_deref(),
            self.online.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        for topic in &all {
            validate_topic_name(topic)?;
        }

        for (i, topic) in all.iter().enumerate() {
            if all[i + 1..].contains(topic) {
                return Err(ValidationError::DuplicateTopic(topic.to_string()));
            }
        }

        Ok(())
    }
}
