//! GPIO abstraction for the lamp relay
//!
//! The agent never touches hardware registers directly. Everything goes through
//! the [`LampPin`] capability trait so the same agent code can drive a real
//! Raspberry Pi pin or the in-memory [`MemoryPin`] used by tests and the
//! simulated backend.

use thiserror::Error;

pub mod memory;
#[cfg(feature = "rpi")]
pub mod rpi;

pub use memory::MemoryPin;
#[cfg(feature = "rpi")]
pub use rpi::RppalPin;

/// Electrical level of a digital pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    /// Decode a raw register value. Only 0 and 1 are meaningful for an output pin.
    pub fn from_raw(raw: u8) -> Result<Self, PinError> {
        match raw {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            other => Err(PinError::UnexpectedLevel(other)),
        }
    }
}

/// Logical lamp state, derived from the pin level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    On,
    Off,
}

impl PinState {
    pub fn from_level(level: Level) -> Self {
        match level {
            Level::High => PinState::On,
            Level::Low => PinState::Off,
        }
    }

    pub fn level(self) -> Level {
        match self {
            PinState::On => Level::High,
            PinState::Off => Level::Low,
        }
    }
}

impl std::fmt::Display for PinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinState::On => write!(f, "on"),
            PinState::Off => write!(f, "off"),
        }
    }
}

/// GPIO errors
#[derive(Debug, Error)]
pub enum PinError {
    #[error("Pin {pin} has not been configured as an output")]
    NotOutput { pin: u8 },
    #[error("Unexpected pin level read from hardware: {0}")]
    UnexpectedLevel(u8),
    #[error("GPIO backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Capability interface for a single digital output pin
///
/// Implementations must reject `set_high`/`set_low` until `set_output`
/// has succeeded.
pub trait LampPin: Send {
    /// BCM pin number, used for logging
    fn number(&self) -> u8;

    /// Configure the pin as a digital output
    fn set_output(&mut self) -> Result<(), PinError>;

    fn set_high(&mut self) -> Result<(), PinError>;

    fn set_low(&mut self) -> Result<(), PinError>;

    /// Read back the level currently driven on the pin
    fn read_level(&self) -> Result<Level, PinError>;

    /// Drive the pin to match a logical state
    fn apply(&mut self, state: PinState) -> Result<(), PinError> {
        match state {
            PinState::On => self.set_high(),
            PinState::Off => self.set_low(),
        }
    }

    fn read_state(&self) -> Result<PinState, PinError> {
        self.read_level().map(PinState::from_level)
    }
}
