//! Lamp agent implementation
//!
//! This module contains the lamp control logic, its event model and the
//! lifecycle driver that connects it to a transport.

pub mod dispatch;
pub mod events;
pub mod lamp;
pub mod lifecycle;

pub use dispatch::{ControlAction, Dispatcher};
pub use events::{AgentEvent, LinkState};
pub use lamp::LampAgent;
pub use lifecycle::AgentLifecycle;
