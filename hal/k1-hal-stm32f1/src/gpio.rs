//! GPIO helpers for STM32F1

use embassy_stm32::gpio::{Input, Pin, Pull};
use embassy_stm32::Peri;

/// Push button wired between the pin and ground, with the internal pull-up
pub struct ButtonPin<'d> {
    input: Input<'d>,
}

impl<'d> ButtonPin<'d> {
    pub fn new(pin: Peri<'d, impl Pin>) -> Self {
        Self {
            input: Input::new(pin, Pull::Up),
        }
    }
}

impl k1_hal::InputPin for ButtonPin<'_> {
    fn is_high(&self) -> bool {
        self.input.is_high()
    }
}
