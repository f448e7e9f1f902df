//! In-memory pin used by tests and the simulated `memory` backend

use super::{LampPin, Level, PinError};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct MemoryPinState {
    is_output: bool,
    raw_level: u8,
    writes: usize,
}

/// Simulated output pin
///
/// Clones share the same underlying state, so a test can hand one clone to
/// the agent and keep another to observe or corrupt the "register".
#[derive(Debug, Clone)]
pub struct MemoryPin {
    number: u8,
    state: Arc<Mutex<MemoryPinState>>,
}

impl MemoryPin {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            state: Arc::new(Mutex::new(MemoryPinState {
                is_output: false,
                raw_level: 0,
                writes: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryPinState> {
        // A poisoned lock only means a panicking test thread held it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current level, bypassing the output-mode check
    pub fn level(&self) -> Level {
        if self.lock().raw_level == 0 {
            Level::Low
        } else {
            Level::High
        }
    }

    pub fn is_output(&self) -> bool {
        self.lock().is_output
    }

    /// Number of successful `set_high`/`set_low` calls
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Force the raw register value, e.g. to simulate a hardware fault
    pub fn inject_raw_level(&self, raw: u8) {
        self.lock().raw_level = raw;
    }

    fn write(&mut self, raw: u8) -> Result<(), PinError> {
        let mut state = self.lock();
        if !state.is_output {
            return Err(PinError::NotOutput { pin: self.number });
        }
        state.raw_level = raw;
        state.writes += 1;
        Ok(())
    }
}

impl LampPin for MemoryPin {
    fn number(&self) -> u8 {
        self.number
    }

    fn set_output(&mut self) -> Result<(), PinError> {
        self.lock().is_output = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinError> {
        self.write(1)
    }

    fn set_low(&mut self) -> Result<(), PinError> {
        self.write(0)
    }

    fn read_level(&self) -> Result<Level, PinError> {
        Level::from_raw(self.lock().raw_level)
    }
}
