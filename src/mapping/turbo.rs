//! Turbo fire
//!
//! While the turbo control is held the modulator owns the fire button of the
//! port and toggles it on a fixed duty cycle, one step per frame. The first
//! held frame always asserts the button; release always forces it off.

use tracing::{debug, info};

use crate::controller::snapshot::{Control, MAX_PORTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TurboState {
    active: bool,
    // Phase counter in 1..=pulse
    toggle: u32,
}

impl Default for TurboState {
    fn default() -> Self {
        Self {
            active: false,
            toggle: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurboModulator {
    states: [TurboState; MAX_PORTS],
    pulse: u32,
    button: Option<Control>,
    disabled_button: Option<Control>,
}

impl TurboModulator {
    /// `pulse` is the full period in frames; the first half is "on"
    pub fn new(button: Option<Control>, pulse: u32, enabled: bool) -> Self {
        let pulse = pulse.max(1);
        let (button, disabled_button) = if enabled {
            (button, None)
        } else {
            (None, button)
        };
        Self {
            states: [TurboState::default(); MAX_PORTS],
            pulse,
            button,
            disabled_button,
        }
    }

    /// Control currently acting as turbo fire
    pub fn button(&self) -> Option<Control> {
        self.button
    }

    pub fn is_enabled(&self) -> bool {
        self.button.is_some()
    }

    pub fn is_active(&self, port: usize) -> bool {
        self.states.get(port).map(|s| s.active).unwrap_or(false)
    }

    /// Advances one frame for `port`; returns the fire level to emit, if any
    ///
    /// `None` means the modulator is idle and leaves the button alone.
    pub fn tick(&mut self, port: usize, held: bool) -> Option<bool> {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        self.button?;
        let pulse = self.pulse;
        let state = self.states.get_mut(port)?;

        if held {
            if state.active {
                if state.toggle == pulse {
                    state.toggle = 1;
                } else {
                    state.toggle += 1;
                }
                Some(state.toggle <= pulse / 2)
            } else {
                debug!("Turbo active on port {}", port);
                state.active = true;
                Some(true)
            }
        } else if state.active {
            debug!("Turbo released on port {}", port);
            *state = TurboState::default();
            Some(false)
        } else {
            None
        }
    }

    /// Drops the pulse of `port` without reporting a release
    pub fn reset(&mut self, port: usize) {
        if let Some(state) = self.states.get_mut(port) {
            if state.active {
                debug!("Turbo reset on port {}", port);
            }
            *state = TurboState::default();
        }
    }

    /// Swaps the turbo control between enabled and disabled
    ///
    /// Returns the fire release events that must be emitted for ports
    /// that were mid-pulse.
    pub fn toggle(&mut self) -> Vec<usize> {
        std::mem::swap(&mut self.button, &mut self.disabled_button);
        info!(
            "Turbo fire {}",
            if self.is_enabled() { "enabled" } else { "disabled" }
        );

        let mut released = Vec::new();
        for (port, state) in self.states.iter_mut().enumerate() {
            if state.active {
                released.push(port);
            }
            *state = TurboState::default();
        }
        released
    }
}
