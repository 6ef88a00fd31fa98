//! Per-frame host input snapshot
//!
//! The host is polled exactly once per frame into an [`InputSnapshot`]. Every
//! stage of the mapper reads from the same snapshot, so no stage ever sees a
//! half-updated device.

use serde::{Deserialize, Serialize};

use super::keys::{HostKey, HOST_KEY_COUNT};

/// Number of logical peripheral slots
pub const MAX_PORTS: usize = 4;

/// Number of host mice that can be passed through
pub const MAX_MICE: usize = 2;

/// Number of digital controls on a pad (face, shoulders, d-pad, select/start)
pub const DIGITAL_CONTROL_COUNT: usize = 16;

/// Digital controls plus the eight analog-stick directions
pub const CONTROL_COUNT: usize = 24;

/// Full scale of an analog axis
pub const AXIS_MAX: i32 = 32767;

/// Abstract control ids of a host pad
///
/// The discriminants are stable: they index every per-port flag table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Control {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
    L2 = 12,
    R2 = 13,
    L3 = 14,
    R3 = 15,
    LeftStickRight = 16,
    LeftStickLeft = 17,
    LeftStickDown = 18,
    LeftStickUp = 19,
    RightStickRight = 20,
    RightStickLeft = 21,
    RightStickDown = 22,
    RightStickUp = 23,
}

impl Control {
    pub const ALL: [Control; CONTROL_COUNT] = [
        Control::B,
        Control::Y,
        Control::Select,
        Control::Start,
        Control::Up,
        Control::Down,
        Control::Left,
        Control::Right,
        Control::A,
        Control::X,
        Control::L,
        Control::R,
        Control::L2,
        Control::R2,
        Control::L3,
        Control::R3,
        Control::LeftStickRight,
        Control::LeftStickLeft,
        Control::LeftStickDown,
        Control::LeftStickUp,
        Control::RightStickRight,
        Control::RightStickLeft,
        Control::RightStickDown,
        Control::RightStickUp,
    ];

    /// D-pad directions
    pub const DPAD: [Control; 4] = [Control::Up, Control::Down, Control::Left, Control::Right];

    /// Every digital control except the d-pad
    pub const BUTTONS: [Control; 12] = [
        Control::B,
        Control::Y,
        Control::Select,
        Control::Start,
        Control::A,
        Control::X,
        Control::L,
        Control::R,
        Control::L2,
        Control::R2,
        Control::L3,
        Control::R3,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Control> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_dpad(self) -> bool {
        matches!(
            self,
            Control::Up | Control::Down | Control::Left | Control::Right
        )
    }

    pub const fn is_face_button(self) -> bool {
        matches!(self, Control::B | Control::Y | Control::A | Control::X)
    }

    pub const fn is_analog_direction(self) -> bool {
        (self as usize) >= DIGITAL_CONTROL_COUNT
    }

    /// Controls that can carry a binding (everything except the d-pad)
    pub const fn is_bindable(self) -> bool {
        !self.is_dpad()
    }
}

/// Analog stick selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stick {
    Left,
    Right,
}

/// Raw position of one analog stick, both axes in -32768..=32767
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StickPosition {
    pub x: i32,
    pub y: i32,
}

impl StickPosition {
    pub const CENTER: StickPosition = StickPosition { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f64 {
        let x = self.x as f64;
        let y = self.y as f64;
        (x * x + y * y).sqrt()
    }
}

/// State of one host pad for this frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PadState {
    pub buttons: [bool; DIGITAL_CONTROL_COUNT],
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
}

impl PadState {
    /// Level of a digital control; analog directions always read as released here
    pub fn held(&self, control: Control) -> bool {
        self.buttons.get(control.index()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, control: Control, held: bool) {
        if let Some(slot) = self.buttons.get_mut(control.index()) {
            *slot = held;
        }
    }

    pub fn stick(&self, stick: Stick) -> StickPosition {
        match stick {
            Stick::Left => self.left_stick,
            Stick::Right => self.right_stick,
        }
    }

    pub fn any_held(&self, controls: &[Control]) -> bool {
        controls.iter().any(|c| self.held(*c))
    }
}

/// Absolute pointer (touch / lightgun style), both axes in -32767..=32767
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    pub pressed: bool,
}

/// Relative host mouse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostMouseState {
    pub dx: i32,
    pub dy: i32,
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Held state of every recognised host key
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardMatrix {
    held: Vec<bool>,
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        Self {
            held: vec![false; HOST_KEY_COUNT],
        }
    }
}

impl KeyboardMatrix {
    pub fn is_held(&self, key: HostKey) -> bool {
        self.held.get(key.index()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: HostKey, held: bool) {
        if let Some(slot) = self.held.get_mut(key.index()) {
            *slot = held;
        }
    }

    pub fn any_held(&self, keys: &[HostKey]) -> bool {
        keys.iter().any(|k| self.is_held(*k))
    }
}

/// Everything the host reported for one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub pads: [PadState; MAX_PORTS],
    pub pointer: PointerState,
    pub mice: [HostMouseState; MAX_MICE],
    pub keyboard: KeyboardMatrix,
}

impl InputSnapshot {
    /// Pad of a port; out-of-range ports read as an idle pad
    pub fn pad(&self, port: usize) -> &PadState {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        static IDLE: PadState = PadState {
            buttons: [false; DIGITAL_CONTROL_COUNT],
            left_stick: StickPosition::CENTER,
            right_stick: StickPosition::CENTER,
        };
        self.pads.get(port).unwrap_or(&IDLE)
    }

    pub fn held(&self, port: usize, control: Control) -> bool {
        self.pad(port).held(control)
    }

    /// Builder helper: press a pad control
    pub fn with_button(mut self, port: usize, control: Control) -> Self {
        if let Some(pad) = self.pads.get_mut(port) {
            pad.set(control, true);
        }
        self
    }

    /// Builder helper: hold a host key
    pub fn with_key(mut self, key: HostKey) -> Self {
        self.keyboard.set(key, true);
        self
    }

    /// Builder helper: deflect a stick
    pub fn with_stick(mut self, port: usize, stick: Stick, x: i32, y: i32) -> Self {
        if let Some(pad) = self.pads.get_mut(port) {
            match stick {
                Stick::Left => pad.left_stick = StickPosition::new(x, y),
                Stick::Right => pad.right_stick = StickPosition::new(x, y),
            }
        }
        self
    }

    /// Builder helper: place the absolute pointer
    pub fn with_pointer(mut self, x: i32, y: i32, pressed: bool) -> Self {
        self.pointer = PointerState { x, y, pressed };
        self
    }

    /// Builder helper: move a host mouse
    pub fn with_mouse(mut self, mouse: usize, state: HostMouseState) -> Self {
        if let Some(slot) = self.mice.get_mut(mouse) {
            *slot = state;
        }
        self
    }
}
