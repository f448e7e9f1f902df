//! Raspberry Pi GPIO backend built on rppal

use super::{LampPin, Level, PinError};
use rppal::gpio::{Gpio, OutputPin};
use tracing::info;

/// Hardware lamp pin
pub struct RppalPin {
    number: u8,
    pin: Option<OutputPin>,
}

impl RppalPin {
    pub fn new(number: u8) -> Self {
        Self { number, pin: None }
    }

    fn output(&mut self) -> Result<&mut OutputPin, PinError> {
        self.pin
            .as_mut()
            .ok_or(PinError::NotOutput { pin: self.number })
    }
}

impl LampPin for RppalPin {
    fn number(&self) -> u8 {
        self.number
    }

    fn set_output(&mut self) -> Result<(), PinError> {
        let gpio = Gpio::new().map_err(|e| PinError::Backend(Box::new(e)))?;
        let mut pin = gpio
            .get(self.number)
            .map_err(|e| PinError::Backend(Box::new(e)))?
            .into_output();

        // Leave the relay where it is when the agent exits or restarts
        pin.set_reset_on_drop(false);

        info!("GPIO pin {} configured as output", self.number);
        self.pin = Some(pin);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinError> {
        self.output()?.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), PinError> {
        self.output()?.set_low();
        Ok(())
    }

    fn read_level(&self) -> Result<Level, PinError> {
        let pin = self
            .pin
            .as_ref()
            .ok_or(PinError::NotOutput { pin: self.number })?;
        Ok(if pin.is_set_high() {
            Level::High
        } else {
            Level::Low
        })
    }
}
