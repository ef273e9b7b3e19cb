//! Push-button debounce and push detection
//!
//! Each button is sampled once per control loop period. A press is
//! classified when the button is released (short push) or while it is still
//! held (long push, raised once per press):
//!
//! ```text
//!            push_ms ≥ long              release_ms ≥ release
//!  pressed ─────────────────► LONG     released ───────────────► SHORT if
//!  push_ms += dt (capped)    (once)    release_ms += dt           short < push_ms < long
//! ```
//!
//! A long push is only raised if the button was seen released (and
//! debounced) since the previous long push, so holding the button through
//! boot does not fire.

use heapless::Vec;

/// Maximum number of buttons one [`Buttons`] instance handles
pub const MAX_BUTTONS: usize = 16;

/// Loop periods at or above this are treated as a stalled loop
pub const STALL_PERIOD_MS: u32 = 500;

/// Button mode flags
pub mod mode {
    /// Report short pushes
    pub const SHORT_PUSH: u8 = 1 << 0;
    /// Report long pushes
    pub const LONG_PUSH: u8 = 1 << 1;
}

/// Push classification thresholds in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonTiming {
    /// Minimum hold time for a short push
    pub short_push_ms: u32,
    /// Hold time that makes a long push
    pub long_push_ms: u32,
    /// Release time before a release is believed
    pub release_ms: u32,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            short_push_ms: 60,
            long_push_ms: 1900,
            release_ms: 30,
        }
    }
}

/// Button errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonError {
    /// Sample discarded because the loop period was too long to debounce
    Stalled,
}

/// Kind of push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushKind {
    Short,
    Long,
}

/// A detected push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    pub button: usize,
    pub kind: PushKind,
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    push_ms: u32,
    release_ms: u32,
    pressed: bool,
    short_push: bool,
    long_push: bool,
    /// Released and debounced since the last long push
    released: bool,
}

/// Debouncer for `B` buttons
#[derive(Debug, Clone)]
pub struct Buttons<const B: usize> {
    modes: [u8; B],
    timing: ButtonTiming,
    states: [ButtonState; B],
}

impl<const B: usize> Buttons<B> {
    const BUTTONS_SUPPORTED: () = assert!(B <= MAX_BUTTONS, "too many buttons");

    /// Create a debouncer; `modes[i]` is a set of [`mode`] flags for button `i`
    pub fn new(modes: [u8; B], timing: ButtonTiming) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::BUTTONS_SUPPORTED;
        Self {
            modes,
            timing,
            states: [ButtonState::default(); B],
        }
    }

    /// Advance by `elapsed_ms` with the current raw state of every button
    pub fn update(&mut self, elapsed_ms: u32, pressed: [bool; B]) -> Result<(), ButtonError> {
        if elapsed_ms >= STALL_PERIOD_MS {
            return Err(ButtonError::Stalled);
        }

        let timing = self.timing;
        for ((state, &flags), pressed) in self.states.iter_mut().zip(&self.modes).zip(pressed) {
            state.pressed = pressed;
            if pressed {
                Self::on_pressed(state, flags, &timing, elapsed_ms);
            } else {
                Self::on_released(state, flags, &timing, elapsed_ms);
            }
        }
        Ok(())
    }

    fn on_pressed(state: &mut ButtonState, flags: u8, timing: &ButtonTiming, elapsed_ms: u32) {
        if state.push_ms < timing.long_push_ms {
            state.push_ms = state.push_ms.saturating_add(elapsed_ms);
        } else if flags & mode::LONG_PUSH != 0 && state.released {
            state.long_push = true;
            state.released = false;
        }

        if state.push_ms > timing.release_ms {
            state.release_ms = 0;
        }
    }

    fn on_released(state: &mut ButtonState, flags: u8, timing: &ButtonTiming, elapsed_ms: u32) {
        if state.release_ms < timing.release_ms {
            state.release_ms = state.release_ms.saturating_add(elapsed_ms);
            return;
        }

        if flags & mode::SHORT_PUSH != 0 {
            let upper = if flags & mode::LONG_PUSH != 0 {
                timing.long_push_ms
            } else {
                u32::MAX
            };
            if state.push_ms > timing.short_push_ms && state.push_ms < upper {
                state.short_push = true;
            }
        }
        state.released = true;
        state.push_ms = 0;
    }

    /// Bit set of buttons with a pending short push; clears them
    pub fn take_short_pushes(&mut self) -> u32 {
        let mut flags = 0;
        for (button, state) in self.states.iter_mut().enumerate() {
            if core::mem::take(&mut state.short_push) {
                flags |= 1 << button;
            }
        }
        flags
    }

    /// Bit set of buttons with a pending long push; clears them
    pub fn take_long_pushes(&mut self) -> u32 {
        let mut flags = 0;
        for (button, state) in self.states.iter_mut().enumerate() {
            if core::mem::take(&mut state.long_push) {
                flags |= 1 << button;
            }
        }
        flags
    }

    /// Drain all pending pushes, long pushes first
    pub fn events(&mut self) -> Vec<ButtonEvent, { 2 * MAX_BUTTONS }> {
        let mut events = Vec::new();
        for (flags, kind) in [
            (self.take_long_pushes(), PushKind::Long),
            (self.take_short_pushes(), PushKind::Short),
        ] {
            for button in (0..B).filter(|b| flags & (1 << b) != 0) {
                // Capacity covers one event of each kind per button
                let _ = events.push(ButtonEvent { button, kind });
            }
        }
        events
    }

    /// Raw state of `button` at the last update
    pub fn is_pressed(&self, button: usize) -> bool {
        self.states.get(button).is_some_and(|s| s.pressed)
    }
}
