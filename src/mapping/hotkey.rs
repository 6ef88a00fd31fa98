//! Hotkeys, pad bindings and the keyboard arbiter
//!
//! The arbiter runs once per frame before anything else and decides whether
//! the physical keyboard may emit keys at all. Hotkeys and pad bindings are
//! edge-tracked here and resolved into [`BindingEdge`]s that the mapper
//! applies.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::controller::keys::HostKey;
use crate::controller::snapshot::{
    Control, InputSnapshot, KeyboardMatrix, PadState, Stick, CONTROL_COUNT,
};

use super::edge::{ControlTable, Edge};
use super::profile::DeviceProfile;
use super::MouseButton;

/// Threshold for treating a stick direction as a pressed control
pub const STICK_DIRECTION_THRESHOLD: i32 = 20000;

/// Emulator-level functions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmuFunction {
    ToggleVkbd,
    ToggleStatusbar,
    ToggleJoyMouse,
    Reset,
    ToggleAspectRatio,
    ToggleZoom,
    ToggleTurbo,
}

/// What a control is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// Host key, translated on emission
    Key(HostKey),
    MouseLeft,
    MouseRight,
    MouseMiddle,
    MouseSlower,
    MouseFaster,
    JoystickFire,
    JoystickSecondFire,
    Emu(EmuFunction),
}

impl Binding {
    pub fn is_key(&self) -> bool {
        matches!(self, Binding::Key(_))
    }
}

/// One configured binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBinding {
    pub control: Control,
    pub action: Binding,
}

/// Keyboard keys that trigger emulator functions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
    pub toggle_vkbd: Option<HostKey>,
    pub toggle_statusbar: Option<HostKey>,
    pub toggle_joy_mouse: Option<HostKey>,
    pub reset: Option<HostKey>,
    pub toggle_aspect_ratio: Option<HostKey>,
    pub toggle_zoom: Option<HostKey>,
    pub toggle_turbo: Option<HostKey>,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            toggle_vkbd: Some(HostKey::F11),
            toggle_statusbar: Some(HostKey::F12),
            toggle_joy_mouse: None,
            reset: None,
            toggle_aspect_ratio: None,
            toggle_zoom: None,
            toggle_turbo: None,
        }
    }
}

impl Hotkeys {
    pub fn entries(&self) -> [(EmuFunction, Option<HostKey>); 7] {
        [
            (EmuFunction::ToggleVkbd, self.toggle_vkbd),
            (EmuFunction::ToggleStatusbar, self.toggle_statusbar),
            (EmuFunction::ToggleJoyMouse, self.toggle_joy_mouse),
            (EmuFunction::Reset, self.reset),
            (EmuFunction::ToggleAspectRatio, self.toggle_aspect_ratio),
            (EmuFunction::ToggleZoom, self.toggle_zoom),
            (EmuFunction::ToggleTurbo, self.toggle_turbo),
        ]
    }

    /// Function whose hotkey is `key`
    pub fn function_for(&self, key: HostKey) -> Option<EmuFunction> {
        self.entries()
            .into_iter()
            .find_map(|(function, hotkey)| (hotkey == Some(key)).then_some(function))
    }
}

/// Lookup table from control to binding
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapperBindings {
    slots: [Option<Binding>; CONTROL_COUNT],
}

impl MapperBindings {
    /// Later entries for the same control win; d-pad entries are dropped
    pub fn from_list(list: &[ControlBinding]) -> Self {
        let mut slots = [None; CONTROL_COUNT];
        for entry in list {
            if !entry.control.is_bindable() {
                debug!("Ignoring binding on d-pad control {:?}", entry.control);
                continue;
            }
            slots[entry.control.index()] = Some(entry.action);
        }
        Self { slots }
    }

    pub fn get(&self, control: Control) -> Option<Binding> {
        self.slots.get(control.index()).copied().flatten()
    }

    pub fn is_bound(&self, control: Control) -> bool {
        self.get(control).is_some()
    }

    /// Bound to a keyboard key or not bound at all
    pub fn is_key_or_unbound(&self, control: Control) -> bool {
        self.get(control).map(|b| b.is_key()).unwrap_or(true)
    }

    pub fn any_bound(&self, controls: &[Control]) -> bool {
        controls.iter().any(|c| self.is_bound(*c))
    }
}

/// Keyboard eligibility decided by the arbiter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyboardMode {
    Full,
    NoCursorKeys,
    SkipKeyboard,
}

/// Decides how much of the physical keyboard may pass this frame
///
/// Port 0 buttons suppress the whole keyboard and port 0 directions only
/// the cursor keys; any control on port 1 suppresses the whole keyboard.
pub fn arbitrate(
    snapshot: &InputSnapshot,
    profiles: &[DeviceProfile],
    keyboard_pass_through: bool,
) -> KeyboardMode {
    if keyboard_pass_through {
        return KeyboardMode::Full;
    }
    let drives_keyboard =
        |port: usize| profiles.get(port).copied() == Some(DeviceProfile::Keyboard);

    let pad0 = snapshot.pad(0);
    let pad1 = snapshot.pad(1);

    if !drives_keyboard(0) && pad0.any_held(&Control::BUTTONS) {
        KeyboardMode::SkipKeyboard
    } else if !drives_keyboard(0) && pad0.any_held(&Control::DPAD) {
        KeyboardMode::NoCursorKeys
    } else if !drives_keyboard(1)
        && (pad1.any_held(&Control::BUTTONS) || pad1.any_held(&Control::DPAD))
    {
        KeyboardMode::SkipKeyboard
    } else {
        KeyboardMode::Full
    }
}

/// Edge tracking of keyboard hotkeys
#[derive(Clone, Debug, Default)]
pub struct HotkeyTracker {
    latched: [bool; 7],
}

impl HotkeyTracker {
    /// Returns the functions that fired this frame
    pub fn process(&mut self, matrix: &KeyboardMatrix, hotkeys: &Hotkeys) -> Vec<EmuFunction> {
        let mut fired = Vec::new();
        for (slot, (function, key)) in self.latched.iter_mut().zip(hotkeys.entries()) {
            let Some(key) = key else {
                *slot = false;
                continue;
            };
            match Edge::from_levels(*slot, matrix.is_held(key)) {
                Edge::Pressed => {
                    info!("Hotkey {:?} -> {:?}", key, function);
                    *slot = true;
                    fired.push(function);
                }
                Edge::Released => *slot = false,
                Edge::Unchanged => {}
            }
        }
        fired
    }

    /// A hotkey is held; its key must not also type
    pub fn any_held(&self) -> bool {
        self.latched.iter().any(|l| *l)
    }
}

/// Resolved effect of a binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingAction {
    Function(EmuFunction),
    Key(HostKey),
    Mouse(MouseButton),
    Slower,
    Faster,
    Fire,
    SecondFire,
}

/// Binding transition of one control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingEdge {
    pub port: usize,
    pub control: Control,
    pub action: BindingAction,
    pub pressed: bool,
}

/// Per-frame inputs of the binding pass for one port
pub struct BindingContext<'a> {
    pub bindings: &'a MapperBindings,
    pub hotkeys: &'a Hotkeys,
    pub profile: DeviceProfile,
    pub overlay_visible: bool,
    pub turbo_button: Option<Control>,
}

fn resolve(binding: Binding, hotkeys: &Hotkeys) -> BindingAction {
    match binding {
        Binding::Key(key) => match hotkeys.function_for(key) {
            Some(function) => BindingAction::Function(function),
            None => BindingAction::Key(key),
        },
        Binding::MouseLeft => BindingAction::Mouse(MouseButton::Left),
        Binding::MouseRight => BindingAction::Mouse(MouseButton::Right),
        Binding::MouseMiddle => BindingAction::Mouse(MouseButton::Middle),
        Binding::MouseSlower => BindingAction::Slower,
        Binding::MouseFaster => BindingAction::Faster,
        Binding::JoystickFire => BindingAction::Fire,
        Binding::JoystickSecondFire => BindingAction::SecondFire,
        Binding::Emu(function) => BindingAction::Function(function),
    }
}

/// Edge tracking of bound pad controls
#[derive(Clone, Debug, Default)]
pub struct PadBindings {
    held: ControlTable,
}

impl PadBindings {
    pub fn is_held(&self, port: usize, control: Control) -> bool {
        self.held.is_set(port, control.index())
    }

    /// Whether a new press of `control` may start a binding
    fn accepts_press(control: Control, ctx: &BindingContext<'_>) -> bool {
        if ctx.turbo_button == Some(control) {
            return false;
        }
        if ctx.profile == DeviceProfile::Cd32Pad
            && matches!(
                control,
                Control::B
                    | Control::Y
                    | Control::A
                    | Control::X
                    | Control::L
                    | Control::R
                    | Control::Start
            )
        {
            return false;
        }
        if ctx.overlay_visible
            && matches!(
                control,
                Control::B | Control::Y | Control::A | Control::X | Control::Start
            )
            && ctx.bindings.is_key_or_unbound(control)
        {
            return false;
        }
        true
    }

    fn level(pad: &PadState, control: Control, was: bool, profile: DeviceProfile) -> bool {
        if !control.is_analog_direction() {
            return pad.held(control);
        }

        let stick = match control {
            Control::LeftStickRight
            | Control::LeftStickLeft
            | Control::LeftStickDown
            | Control::LeftStickUp => {
                if profile == DeviceProfile::AnalogJoystick {
                    return false;
                }
                pad.stick(Stick::Left)
            }
            _ => pad.stick(Stick::Right),
        };
        let (value, positive) = match control {
            Control::LeftStickRight | Control::RightStickRight => (stick.x, true),
            Control::LeftStickLeft | Control::RightStickLeft => (stick.x, false),
            Control::LeftStickDown | Control::RightStickDown => (stick.y, true),
            _ => (stick.y, false),
        };
        let t = STICK_DIRECTION_THRESHOLD;
        match (positive, was) {
            (true, false) => value > t,
            (true, true) => value >= t,
            (false, false) => value < -t,
            (false, true) => value <= -t,
        }
    }

    /// Edge-tracks every bindable control of a port
    ///
    /// Presses that are not eligible this frame are withheld, releases of
    /// latched controls always pass.
    pub fn process(
        &mut self,
        port: usize,
        pad: &PadState,
        ctx: &BindingContext<'_>,
    ) -> Vec<BindingEdge> {
        let mut edges = Vec::new();

        for control in Control::ALL {
            if !control.is_bindable() {
                continue;
            }
            let was = self.held.is_set(port, control.index());
            let level = Self::level(pad, control, was, ctx.profile);

            let pressed = match (was, level) {
                (false, true) => {
                    if !Self::accepts_press(control, ctx) {
                        continue;
                    }
                    true
                }
                (true, false) => false,
                _ => continue,
            };
            self.held.set(port, control.index(), pressed);

            if let Some(binding) = ctx.bindings.get(control) {
                let action = resolve(binding, ctx.hotkeys);
                debug!(
                    "Binding {:?} on port {} {}",
                    control,
                    port,
                    if pressed { "pressed" } else { "released" }
                );
                edges.push(BindingEdge {
                    port,
                    control,
                    action,
                    pressed,
                });
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(bindings: &'a MapperBindings, hotkeys: &'a Hotkeys) -> BindingContext<'a> {
        BindingContext {
            bindings,
            hotkeys,
            profile: DeviceProfile::RetroPad,
            overlay_visible: false,
            turbo_button: None,
        }
    }

    #[test]
    fn arbiter_precedence() {
        let profiles = [DeviceProfile::RetroPad; 4];
        let idle = InputSnapshot::default();
        assert_eq!(arbitrate(&idle, &profiles, false), KeyboardMode::Full);

        let button = idle.clone().with_button(0, Control::L2);
        assert_eq!(arbitrate(&button, &profiles, false), KeyboardMode::SkipKeyboard);
        assert_eq!(arbitrate(&button, &profiles, true), KeyboardMode::Full);

        let dpad0 = idle.clone().with_button(0, Control::Left);
        assert_eq!(arbitrate(&dpad0, &profiles, false), KeyboardMode::NoCursorKeys);

        let dpad1 = idle.clone().with_button(1, Control::Left);
        assert_eq!(arbitrate(&dpad1, &profiles, false), KeyboardMode::SkipKeyboard);

        let keyboard_pad = [DeviceProfile::Keyboard; 4];
        assert_eq!(arbitrate(&button, &keyboard_pad, false), KeyboardMode::Full);
    }

    #[test]
    fn hotkey_fires_once_per_press() {
        let hotkeys = Hotkeys::default();
        let mut tracker = HotkeyTracker::default();
        let held = InputSnapshot::default().with_key(HostKey::F11);

        assert_eq!(
            tracker.process(&held.keyboard, &hotkeys),
            vec![EmuFunction::ToggleVkbd]
        );
        assert!(tracker.any_held());
        assert!(tracker.process(&held.keyboard, &hotkeys).is_empty());
        assert!(tracker
            .process(&InputSnapshot::default().keyboard, &hotkeys)
            .is_empty());
        assert!(!tracker.any_held());
    }

    #[test]
    fn key_binding_matching_a_hotkey_becomes_a_function() {
        let hotkeys = Hotkeys::default();
        let bindings = MapperBindings::from_list(&[
            ControlBinding {
                control: Control::L,
                action: Binding::Key(HostKey::F12),
            },
            ControlBinding {
                control: Control::R,
                action: Binding::Key(HostKey::SPACE),
            },
        ]);
        let mut pad_bindings = PadBindings::default();
        let snap = InputSnapshot::default()
            .with_button(0, Control::L)
            .with_button(0, Control::R);

        let edges = pad_bindings.process(0, snap.pad(0), &ctx(&bindings, &hotkeys));
        let actions: Vec<BindingAction> = edges.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                BindingAction::Function(EmuFunction::ToggleStatusbar),
                BindingAction::Key(HostKey::SPACE)
            ]
        );
    }

    #[test]
    fn stick_directions_use_threshold() {
        let hotkeys = Hotkeys::default();
        let bindings = MapperBindings::from_list(&[ControlBinding {
            control: Control::RightStickUp,
            action: Binding::MouseFaster,
        }]);
        let mut pad_bindings = PadBindings::default();

        let at = InputSnapshot::default().with_stick(0, Stick::Right, 0, -STICK_DIRECTION_THRESHOLD);
        assert!(pad_bindings
            .process(0, at.pad(0), &ctx(&bindings, &hotkeys))
            .is_empty());

        let beyond =
            InputSnapshot::default().with_stick(0, Stick::Right, 0, -STICK_DIRECTION_THRESHOLD - 1);
        let edges = pad_bindings.process(0, beyond.pad(0), &ctx(&bindings, &hotkeys));
        assert_eq!(edges.len(), 1);
        assert!(edges[0].pressed);

        // Holding exactly at the threshold keeps the direction
        assert!(pad_bindings
            .process(0, at.pad(0), &ctx(&bindings, &hotkeys))
            .is_empty());
        let edges = pad_bindings.process(
            0,
            InputSnapshot::default().pad(0),
            &ctx(&bindings, &hotkeys),
        );
        assert_eq!(edges.len(), 1);
        assert!(!edges[0].pressed);
    }

    #[test]
    fn overlay_withholds_key_bound_face_buttons() {
        let hotkeys = Hotkeys::default();
        let bindings = MapperBindings::from_list(&[
            ControlBinding {
                control: Control::A,
                action: Binding::Key(HostKey::SPACE),
            },
            ControlBinding {
                control: Control::X,
                action: Binding::MouseRight,
            },
        ]);
        let mut pad_bindings = PadBindings::default();
        let mut context = ctx(&bindings, &hotkeys);
        context.overlay_visible = true;

        let snap = InputSnapshot::default()
            .with_button(1, Control::A)
            .with_button(1, Control::X);
        let edges = pad_bindings.process(1, snap.pad(1), &context);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].action, BindingAction::Mouse(MouseButton::Right));
    }

    #[test]
    fn cd32_native_buttons_are_not_bound() {
        let hotkeys = Hotkeys::default();
        let bindings = MapperBindings::from_list(&[ControlBinding {
            control: Control::B,
            action: Binding::Key(HostKey::SPACE),
        }]);
        let mut pad_bindings = PadBindings::default();
        let mut context = ctx(&bindings, &hotkeys);
        context.profile = DeviceProfile::Cd32Pad;

        let snap = InputSnapshot::default().with_button(0, Control::B);
        assert!(pad_bindings.process(0, snap.pad(0), &context).is_empty());
    }
}
