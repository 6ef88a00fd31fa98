//! Modul für die Umwandlung von Host-Eingaben in emulierte Geräteereignisse.
//!
//! Every frame the [`InputMapper`] receives an [`InputSnapshot`] of all host
//! controls and turns it into a list of [`MappedEvent`]s for the emulated
//! joysticks, mice and keyboard. The [`MappingEngine`] drives the mapper at a
//! fixed frame rate on a tokio task.
//!
//! [`InputSnapshot`]: crate::controller::InputSnapshot

pub mod analog;
pub mod edge;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod keyboard;
pub mod mapper;
pub mod profile;
pub mod sink;
pub mod status;
pub mod turbo;
pub mod vkbd;

// Re-exports für einfacheren Zugriff
pub use analog::Axis;
pub use engine::{MappingEngine, MappingEngineHandle, MappingEngineState};
pub use error::MappingError;
pub use hotkey::{Binding, ControlBinding, EmuFunction, Hotkeys, KeyboardMode};
pub use keyboard::EmuKey;
pub use mapper::InputMapper;
pub use profile::{DeviceProfile, FaceLayout};
pub use sink::{DeviceSink, RecordingSink, TracingSink};

/// Emulated mouse buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Requests to the on-screen keyboard renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayCommand {
    TogglePosition,
    ToggleTransparency,
}

/// Ausgabe-Event-Typ der Mapping-Engine
#[derive(Clone, Debug, PartialEq)]
pub enum MappedEvent {
    /// Digital joystick axis, -1, 0 or 1
    JoystickAxis { port: usize, axis: Axis, value: i8 },
    JoystickButton { port: usize, button: u8, pressed: bool },
    /// Raw analog joystick axis
    JoystickAnalog { port: usize, axis: Axis, value: i32 },
    MouseMove { port: usize, dx: i32, dy: i32 },
    MouseButton {
        port: usize,
        button: MouseButton,
        pressed: bool,
    },
    Key { key: EmuKey, pressed: bool },
    /// Emulator-level function request
    Command(EmuFunction),
    Overlay(OverlayCommand),
}

impl MappedEvent {
    pub fn key(key: EmuKey, pressed: bool) -> Self {
        MappedEvent::Key { key, pressed }
    }
}
