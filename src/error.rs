//! Error types for the lamp agent
//!
//! Handlers return [`AgentResult`]; the lifecycle driver decides with
//! [`AgentError::is_fatal`] whether an error stops the agent or is only logged.

use crate::gpio::PinError;
use thiserror::Error;

/// Main error type for lamp agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("GPIO fault: {0}")]
    PinFault(#[from] PinError),

    #[error("Subscription to {topic} failed: {message}")]
    SubscriptionFailed { topic: String, message: String },

    #[error("Broker rejected subscription (packet id {packet_id})")]
    SubscriptionRejected { packet_id: u16 },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Transport error: {0}")]
    TransportError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl AgentError {
    /// Whether the agent must stop after this error.
    ///
    /// Subscription problems and GPIO faults cannot be repaired at the agent
    /// layer. Publish failures are left to the client's reconnect.
    pub fn is_fatal(&self) -> bool {
        match self {
            AgentError::PinFault(_)
            | AgentError::SubscriptionFailed { .. }
            | AgentError::SubscriptionRejected { .. }
            | AgentError::ConfigError(_)
            | AgentError::InternalError { .. } => true,
            AgentError::TransportError(_) => false,
        }
    }

    /// Create subscription failure error
    pub fn subscription_failed<T: Into<String>, M: std::fmt::Display>(topic: T, message: M) -> Self {
        Self::SubscriptionFailed {
            topic: topic.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a transport error
    pub fn transport<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::TransportError(Box::new(error))
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;
