//! Gamepad input via gilrs
//!
//! Samples up to [`MAX_PORTS`] connected gamepads into the per-frame snapshot.
//! Pads are assigned to ports in the order gilrs reports them.

use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tracing::{debug, error, info, warn};

use super::snapshot::{Control, InputSnapshot, PadState, StickPosition, AXIS_MAX, MAX_PORTS};
use super::source::{InputSource, SourceError};

#[state]
#[derive(Debug, Clone)]
pub enum GilrsSourceState {
    Initializing,
    Polling,
}

#[machine]
#[derive(Debug)]
pub struct GilrsSource<S: GilrsSourceState> {
    gilrs: Gilrs,

    // Gamepads in port order
    ports: Vec<GamepadId>,
}

impl GilrsSource<Initializing> {
    pub fn create() -> Result<Self, SourceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SourceError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, Vec::new()))
    }

    /// Assigns the connected gamepads to ports and starts polling
    pub fn initialize(mut self) -> GilrsSource<Polling> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, continuing in idle mode");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
        }

        self.ports = gamepads
            .iter()
            .take(MAX_PORTS)
            .map(|(id, _)| *id)
            .collect();

        self.transition()
    }
}

impl GilrsSource<Polling> {
    fn drain_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    if self.ports.len() < MAX_PORTS && !self.ports.contains(&id) {
                        info!("Gamepad {} connected on port {}", id, self.ports.len());
                        self.ports.push(id);
                    }
                }
                EventType::Disconnected => {
                    warn!("Gamepad {} disconnected", id);
                    self.ports.retain(|p| *p != id);
                }
                _ => debug!("Gamepad event: {:?}", event),
            }
        }
    }
}

impl InputSource for GilrsSource<Polling> {
    fn poll(&mut self) -> InputSnapshot {
        self.drain_events();

        let mut snapshot = InputSnapshot::default();
        for (port, id) in self.ports.iter().enumerate() {
            if let Some(gamepad) = self.gilrs.connected_gamepad(*id) {
                snapshot.pads[port] = read_pad(&gamepad);
            }
        }
        snapshot
    }

    fn name(&self) -> &str {
        "gilrs"
    }
}

fn read_pad(gamepad: &Gamepad<'_>) -> PadState {
    let mut pad = PadState::default();
    for (button, control) in BUTTON_MAP {
        pad.set(control, gamepad.is_pressed(button));
    }
    pad.left_stick = StickPosition::new(
        scale_axis(gamepad.value(Axis::LeftStickX)),
        -scale_axis(gamepad.value(Axis::LeftStickY)),
    );
    pad.right_stick = StickPosition::new(
        scale_axis(gamepad.value(Axis::RightStickX)),
        -scale_axis(gamepad.value(Axis::RightStickY)),
    );
    pad
}

// gilrs reports -1.0..=1.0 with up positive
fn scale_axis(value: f32) -> i32 {
    (value.clamp(-1.0, 1.0) * AXIS_MAX as f32) as i32
}

const BUTTON_MAP: [(Button, Control); 16] = [
    (Button::South, Control::B),
    (Button::East, Control::A),
    (Button::West, Control::Y),
    (Button::North, Control::X),
    (Button::Select, Control::Select),
    (Button::Start, Control::Start),
    (Button::LeftTrigger, Control::L),
    (Button::RightTrigger, Control::R),
    (Button::LeftTrigger2, Control::L2),
    (Button::RightTrigger2, Control::R2),
    (Button::LeftThumb, Control::L3),
    (Button::RightThumb, Control::R3),
    (Button::DPadUp, Control::Up),
    (Button::DPadDown, Control::Down),
    (Button::DPadLeft, Control::Left),
    (Button::DPadRight, Control::Right),
];
