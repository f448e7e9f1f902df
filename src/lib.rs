//! Lamp Agent - MQTT to GPIO bridge
//!
//! Exposes a single relay-driven lamp on a GPIO output pin as a device on an
//! MQTT broker. Commands arriving on the set topic drive the pin; the pin's
//! actual level is read back and published on the report topic.
//!
//! # Overview
//!
//! - Protocol variants (boolean, word, minimal) and their topic layouts
//! - GPIO pin abstraction with Raspberry Pi and in-memory backends
//! - MQTT transport with last will, reconnect backoff and resubscription
//! - Connection lifecycle with graceful shutdown
//!
//! # Quick Start
//!
//! ```rust
//! use lamp_agent::gpio::{LampPin, MemoryPin, PinState};
//! use lamp_agent::protocol::{PayloadFormat, ProtocolVariant};
//!
//! let topics = ProtocolVariant::Boolean.default_topics("bedroom/lamp");
//! assert_eq!(topics.set, "bedroom/lamp/setOn");
//!
//! let state = PayloadFormat::Boolean.decode_command(b"true").unwrap();
//! assert_eq!(state, PinState::On);
//!
//! let mut pin = MemoryPin::new(24);
//! pin.set_output().unwrap();
//! pin.apply(state).unwrap();
//! assert_eq!(pin.read_state().unwrap(), PinState::On);
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod gpio;
pub mod observability;
pub mod protocol;
pub mod testing;
pub mod transport;

pub use agent::{AgentLifecycle, LampAgent};
pub use config::*;
pub use error::{AgentError, AgentResult};
pub use transport::mqtt::MqttClient;
