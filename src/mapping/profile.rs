//! Device profiles and the control-to-button mapping of each profile

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controller::snapshot::{Control, MAX_PORTS};

/// Peripheral type occupying a port
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceProfile {
    #[default]
    None,
    /// Single-button digital joystick
    Joystick,
    /// RetroPad-style gamepad
    RetroPad,
    /// CD32-style pad with seven buttons
    Cd32Pad,
    /// Analog joystick
    AnalogJoystick,
    Mouse,
    /// Gamepad acting as a keyboard only
    Keyboard,
}

impl DeviceProfile {
    /// Profiles whose controls drive an emulated joystick
    pub fn is_joystick_like(self) -> bool {
        matches!(
            self,
            DeviceProfile::Joystick
                | DeviceProfile::RetroPad
                | DeviceProfile::Cd32Pad
                | DeviceProfile::AnalogJoystick
        )
    }

    /// Profiles that evaluate pad bindings
    pub fn uses_bindings(self) -> bool {
        matches!(
            self,
            DeviceProfile::RetroPad | DeviceProfile::Cd32Pad | DeviceProfile::AnalogJoystick
        )
    }

    /// Profiles whose face buttons give way to keyboard bindings
    pub fn yields_face_buttons_to_bindings(self) -> bool {
        matches!(
            self,
            DeviceProfile::RetroPad | DeviceProfile::AnalogJoystick
        )
    }
}

/// Face-button layout variants
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceLayout {
    #[default]
    Normal,
    /// Face buttons rotated by one position
    Rotate,
    /// A becomes an Up-direction jump
    Jump,
    /// Rotated, with B as an Up-direction jump
    RotateJump,
}

impl FaceLayout {
    pub fn is_rotated(self) -> bool {
        matches!(self, FaceLayout::Rotate | FaceLayout::RotateJump)
    }

    /// The face button that turns into a jump, if any
    pub fn jump_control(self) -> Option<Control> {
        match self {
            FaceLayout::Jump => Some(Control::A),
            FaceLayout::RotateJump => Some(Control::B),
            _ => None,
        }
    }
}

/// What a control resolves to on the emulated device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonTarget {
    /// Emulated joystick button number (0 = fire)
    Button(u8),
    /// Up-direction jump instead of a button
    AltJump,
    Unbound,
}

/// Pure mapping from (port, control) to an emulated joystick control
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileMapper {
    profiles: [DeviceProfile; MAX_PORTS],
    retropad_layout: FaceLayout,
    cd32_layout: FaceLayout,
}

impl ProfileMapper {
    pub fn new(
        profiles: [DeviceProfile; MAX_PORTS],
        retropad_layout: FaceLayout,
        cd32_layout: FaceLayout,
    ) -> Self {
        debug!(
            "Profile mapper: {:?}, retropad {:?}, cd32 {:?}",
            profiles, retropad_layout, cd32_layout
        );
        Self {
            profiles,
            retropad_layout,
            cd32_layout,
        }
    }

    pub fn profile(&self, port: usize) -> DeviceProfile {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        self.profiles.get(port).copied().unwrap_or_default()
    }

    /// Profiles of all host ports
    pub fn profiles(&self) -> &[DeviceProfile; MAX_PORTS] {
        &self.profiles
    }

    /// Layout in effect for a port's profile
    pub fn layout(&self, port: usize) -> FaceLayout {
        match self.profile(port) {
            DeviceProfile::RetroPad | DeviceProfile::Joystick => self.retropad_layout,
            DeviceProfile::Cd32Pad => self.cd32_layout,
            _ => FaceLayout::Normal,
        }
    }

    pub fn map(&self, port: usize, control: Control) -> ButtonTarget {
        let profile = self.profile(port);
        if !profile.is_joystick_like() {
            return ButtonTarget::Unbound;
        }

        let layout = self.layout(port);
        if layout.jump_control() == Some(control) {
            return ButtonTarget::AltJump;
        }

        let face = if layout.is_rotated() {
            match control {
                Control::Y => Some(0),
                Control::B => Some(1),
                Control::X => Some(2),
                Control::A => Some(3),
                _ => None,
            }
        } else {
            match control {
                Control::B => Some(0),
                Control::A => Some(1),
                Control::Y => Some(2),
                Control::X => Some(3),
                _ => None,
            }
        };
        if let Some(button) = face {
            return ButtonTarget::Button(button);
        }

        if profile == DeviceProfile::Cd32Pad {
            return match control {
                Control::L => ButtonTarget::Button(4),
                Control::R => ButtonTarget::Button(5),
                Control::Start => ButtonTarget::Button(6),
                _ => ButtonTarget::Unbound,
            };
        }
        ButtonTarget::Unbound
    }

    /// Pad control that produces the primary fire button
    pub fn fire_control(&self, port: usize) -> Control {
        if self.layout(port).is_rotated() {
            Control::Y
        } else {
            Control::B
        }
    }

    /// Pad control that produces the secondary fire button
    pub fn second_fire_control(&self, port: usize) -> Control {
        if self.layout(port).is_rotated() {
            Control::B
        } else {
            Control::A
        }
    }
}
