//! User inputs
//!
//! Push buttons are sampled by the control loop and turned into discrete
//! short/long push events here.

pub mod button;

pub use button::{
    mode, ButtonError, ButtonEvent, ButtonTiming, Buttons, PushKind, MAX_BUTTONS,
    STALL_PERIOD_MS,
};

use k1_hal::InputPin;

/// Sample active-low buttons (pressed pulls the pin to ground)
pub fn sample_active_low<P: InputPin, const B: usize>(pins: &[P; B]) -> [bool; B] {
    core::array::from_fn(|i| pins[i].is_low())
}
