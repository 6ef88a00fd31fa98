//! Per-frame input mapper
//!
//! Owns every flag table and timer of the translation and runs the stages
//! in a fixed order on one snapshot:
//!
//! ```text
//! arbiter ─► hotkeys ─► keyboard ─► keypad ─► pad bindings
//!         ─► virtual keyboard ─► joysticks + turbo ─► mice
//! ```

use tracing::{debug, info};

use crate::config::{MapperConfig, MouseStick};
use crate::controller::snapshot::{
    Control, InputSnapshot, PadState, Stick, StickPosition, CONTROL_COUNT, MAX_MICE, MAX_PORTS,
};
use crate::controller::HostKey;

use super::analog::{
    deadzone_radius, forwarded_axes, gate, track_directions, Axis, DpadDirections, DpadMouse,
    MouseCurve, SpeedModifiers,
};
use super::edge::ControlTable;
use super::hotkey::{
    arbitrate, BindingAction, BindingContext, BindingEdge, EmuFunction, HotkeyTracker, Hotkeys,
    KeyboardMode, MapperBindings, PadBindings,
};
use super::keyboard::{step_axis_gated, CapsLock, KeyboardPassThrough, KeypadJoysticks};
use super::profile::{ButtonTarget, DeviceProfile, ProfileMapper};
use super::status::{PortReadout, StatusTables};
use super::turbo::TurboModulator;
use super::vkbd::{NavigatorInput, NavigatorOutput, VirtualKeyboard, VkbdLayout};
use super::{MappedEvent, MouseButton};

/// Joystick buttons that bindings and turbo can drive besides the pad
const SHARED_BUTTONS: usize = 2;

const LEFT_STICK_DIRECTIONS: [Control; 4] = [
    Control::LeftStickRight,
    Control::LeftStickLeft,
    Control::LeftStickDown,
    Control::LeftStickUp,
];

const RIGHT_STICK_DIRECTIONS: [Control; 4] = [
    Control::RightStickRight,
    Control::RightStickLeft,
    Control::RightStickDown,
    Control::RightStickUp,
];

/// Status flag recording a mouse button
fn mouse_flag(button: MouseButton) -> Control {
    match button {
        MouseButton::Left => Control::B,
        MouseButton::Right => Control::A,
        MouseButton::Middle => Control::Y,
    }
}

/// Pad controls mapped to joystick buttons for a profile
fn joystick_buttons(profile: DeviceProfile) -> &'static [Control] {
    match profile {
        DeviceProfile::Joystick => &[Control::B, Control::Y, Control::A],
        DeviceProfile::Cd32Pad => &[
            Control::B,
            Control::Y,
            Control::A,
            Control::X,
            Control::L,
            Control::R,
            Control::Start,
        ],
        DeviceProfile::RetroPad | DeviceProfile::AnalogJoystick => {
            &[Control::B, Control::Y, Control::A, Control::X]
        }
        _ => &[],
    }
}

pub struct InputMapper {
    profiles: ProfileMapper,
    port_order: [usize; MAX_PORTS],
    bindings: MapperBindings,
    hotkeys: Hotkeys,
    keyboard_pass_through: bool,
    keypad_enabled: bool,
    multi_mouse: bool,
    mouse_stick: MouseStick,
    deadzone: i32,
    curve: MouseCurve,

    turbo: TurboModulator,
    hotkey_tracker: HotkeyTracker,
    pad_bindings: PadBindings,
    keyboard: KeyboardPassThrough,
    keypad: KeypadJoysticks,
    caps: CapsLock,
    vkbd: VirtualKeyboard,
    dpad_mouse: DpadMouse,

    /// Joystick flags by emulated port
    joystick: ControlTable,
    /// Fire buttons held by bindings, by emulated port
    binding_fire: [[bool; SHARED_BUTTONS]; MAX_PORTS],
    /// Turbo pulse level while turbo is active, by emulated port
    turbo_fire: [Option<bool>; MAX_PORTS],
    /// Last emitted level of the shared fire buttons, by emulated port
    fire_level: [[bool; SHARED_BUTTONS]; MAX_PORTS],
    /// Alternate jump latched, by emulated port
    alt_jump: [bool; MAX_PORTS],
    /// Analog joystick flags by host port
    analog: ControlTable,
    analog_axes: [[i32; 2]; MAX_PORTS],
    /// Mouse flags by mouse
    mouse_flags: ControlTable,
    mouse_buttons: [[bool; 3]; MAX_MICE],
    binding_mouse: [[bool; 3]; MAX_MICE],
    modifiers: [SpeedModifiers; MAX_PORTS],

    mouse_mode: bool,
    statusbar_visible: bool,
    keyboard_mode: KeyboardMode,
}

impl InputMapper {
    pub fn new(config: &MapperConfig) -> Self {
        let profiles = ProfileMapper::new(
            config.profiles,
            config.retropad_layout,
            config.cd32_layout,
        );
        let mouse_mode = config.profiles[..2].contains(&DeviceProfile::Mouse);
        info!(
            "Input mapper created: profiles {:?}, mouse mode {}",
            config.profiles, mouse_mode
        );

        Self {
            profiles,
            port_order: config.port_order,
            bindings: MapperBindings::from_list(&config.bindings),
            hotkeys: config.hotkeys.clone(),
            keyboard_pass_through: config.keyboard_pass_through,
            keypad_enabled: config.keypad_joysticks,
            multi_mouse: config.multi_mouse,
            mouse_stick: config.analog.mouse_stick,
            deadzone: deadzone_radius(config.analog.deadzone),
            curve: MouseCurve {
                speed: config.analog.mouse_speed,
                slow_factor: config.analog.slow_factor,
                fast_factor: config.analog.fast_factor,
            },
            turbo: TurboModulator::new(config.turbo.button, config.turbo.pulse, config.turbo.enabled),
            hotkey_tracker: HotkeyTracker::default(),
            pad_bindings: PadBindings::default(),
            keyboard: KeyboardPassThrough::default(),
            keypad: KeypadJoysticks::default(),
            caps: CapsLock::default(),
            vkbd: VirtualKeyboard::new(VkbdLayout::default(), config.vkbd, config.sticky_keys),
            dpad_mouse: DpadMouse::new(config.dpad_mouse_speed),
            joystick: ControlTable::new(),
            binding_fire: [[false; SHARED_BUTTONS]; MAX_PORTS],
            turbo_fire: [None; MAX_PORTS],
            fire_level: [[false; SHARED_BUTTONS]; MAX_PORTS],
            alt_jump: [false; MAX_PORTS],
            analog: ControlTable::new(),
            analog_axes: [[0; 2]; MAX_PORTS],
            mouse_flags: ControlTable::new(),
            mouse_buttons: [[false; 3]; MAX_MICE],
            binding_mouse: [[false; 3]; MAX_MICE],
            modifiers: [SpeedModifiers::default(); MAX_PORTS],
            mouse_mode,
            statusbar_visible: true,
            keyboard_mode: KeyboardMode::Full,
        }
    }

    pub fn mouse_mode(&self) -> bool {
        self.mouse_mode
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.vkbd.is_visible()
    }

    pub fn is_statusbar_visible(&self) -> bool {
        self.statusbar_visible
    }

    pub fn is_turbo_enabled(&self) -> bool {
        self.turbo.is_enabled()
    }

    /// Keyboard mode chosen by the arbiter for the last frame
    pub fn keyboard_mode(&self) -> KeyboardMode {
        self.keyboard_mode
    }

    pub fn virtual_keyboard(&self) -> &VirtualKeyboard {
        &self.vkbd
    }

    pub fn caps_lock(&self) -> bool {
        self.caps.is_active()
    }

    fn target(&self, port: usize) -> usize {
        self.port_order.get(port).copied().unwrap_or(port)
    }

    /// Translates one snapshot; `now_ms` is a monotonic millisecond clock
    pub fn process_frame(&mut self, snapshot: &InputSnapshot, now_ms: u64) -> Vec<MappedEvent> {
        let mut out = Vec::new();

        self.keyboard_mode =
            arbitrate(snapshot, self.profiles.profiles(), self.keyboard_pass_through);

        for function in self.hotkey_tracker.process(&snapshot.keyboard, &self.hotkeys) {
            self.apply_function(function, &mut out);
        }
        if !self.hotkey_tracker.any_held() {
            self.keyboard.process(
                &snapshot.keyboard,
                self.keyboard_mode,
                self.vkbd.is_visible(),
                self.keypad_enabled,
                &mut self.caps,
                &mut out,
            );
        }
        if self.keypad_enabled {
            self.keypad.process(&snapshot.keyboard, &mut out);
        }

        self.process_bindings(snapshot, &mut out);
        let navigator = self.process_navigator(snapshot, now_ms, &mut out);

        if !self.mouse_mode {
            for port in 0..MAX_PORTS {
                self.process_joystick(port, snapshot.pad(port), &mut out);
            }
        }
        self.process_mouse(snapshot, &navigator, now_ms, &mut out);

        if !out.is_empty() {
            debug!("Frame at {} ms produced {} events", now_ms, out.len());
        }
        out
    }

    /// Runs an emulator function and reports it to the host
    pub fn apply_function(&mut self, function: EmuFunction, out: &mut Vec<MappedEvent>) {
        info!("Emulator function {:?}", function);
        out.push(MappedEvent::Command(function));

        match function {
            EmuFunction::ToggleVkbd => self.vkbd.toggle(out),
            EmuFunction::ToggleStatusbar => self.statusbar_visible = !self.statusbar_visible,
            EmuFunction::ToggleJoyMouse => {
                self.mouse_mode = !self.mouse_mode;
                info!(
                    "Switched to {} mode",
                    if self.mouse_mode { "mouse" } else { "joystick" }
                );
                for port in 0..2 {
                    self.release_joystick(port, out);
                }
            }
            EmuFunction::ToggleTurbo => {
                for port in self.turbo.toggle() {
                    let target = self.target(port);
                    self.turbo_fire[target] = None;
                    self.sync_fire(port, 0, out);
                }
                // A latched control that just became the turbo button is never released otherwise
                if let Some(button) = self.turbo.button() {
                    for port in 0..MAX_PORTS {
                        let target = self.target(port);
                        if self.joystick.is_set(target, button.index()) {
                            self.joystick.set(target, button.index(), false);
                            self.release_native(port, button, out);
                        }
                    }
                }
            }
            EmuFunction::Reset | EmuFunction::ToggleAspectRatio | EmuFunction::ToggleZoom => {}
        }
    }

    /// Releases everything the joystick path holds for a host port
    fn release_joystick(&mut self, port: usize, out: &mut Vec<MappedEvent>) {
        let target = self.target(port);
        let active = self.joystick.active(target);
        let held = |c: Control| active.contains(&c.index());

        if held(Control::Up) || held(Control::Down) || self.alt_jump[target] {
            out.push(MappedEvent::JoystickAxis {
                port: target,
                axis: Axis::Vertical,
                value: 0,
            });
        }
        if held(Control::Left) || held(Control::Right) {
            out.push(MappedEvent::JoystickAxis {
                port: target,
                axis: Axis::Horizontal,
                value: 0,
            });
        }
        self.joystick.clear_port(target);
        for index in active {
            let Some(control) = Control::from_index(index) else {
                continue;
            };
            if !control.is_dpad() {
                self.release_native(port, control, out);
            }
        }
        self.alt_jump[target] = false;

        // Turbo is not ticked in mouse mode, so its pulse is dropped here
        self.turbo.reset(port);
        self.turbo_fire[target] = None;
        self.binding_fire[target] = [false; SHARED_BUTTONS];
        for button in 0..SHARED_BUTTONS {
            self.sync_fire(port, button, out);
        }
    }

    /// Emits the release of a joystick button whose flag was just cleared
    fn release_native(&mut self, port: usize, control: Control, out: &mut Vec<MappedEvent>) {
        let ButtonTarget::Button(button) = self.profiles.map(port, control) else {
            return;
        };
        if usize::from(button) < SHARED_BUTTONS {
            self.sync_fire(port, usize::from(button), out);
        } else if !self.is_keymapped(port, control) {
            out.push(MappedEvent::JoystickButton {
                port: self.target(port),
                button,
                pressed: false,
            });
        }
    }

    /// Face button handed to a key binding instead of the joystick
    fn is_keymapped(&self, port: usize, control: Control) -> bool {
        self.profiles.profile(port).yields_face_buttons_to_bindings()
            && control.is_face_button()
            && self.bindings.is_bound(control)
    }

    /// Whether the pad itself holds shared fire button `button`
    fn native_fire(&self, port: usize, button: usize) -> bool {
        let control = if button == 0 {
            self.profiles.fire_control(port)
        } else {
            self.profiles.second_fire_control(port)
        };
        self.joystick.is_set(self.target(port), control.index())
            && self.profiles.map(port, control) == ButtonTarget::Button(button as u8)
            && !self.is_keymapped(port, control)
    }

    /// Emits an edge when the combined level of a shared fire button changes
    ///
    /// Active turbo owns fire button 0; otherwise the pad and bindings are
    /// combined.
    fn sync_fire(&mut self, port: usize, button: usize, out: &mut Vec<MappedEvent>) {
        let target = self.target(port);
        let level = match self.turbo_fire[target] {
            Some(pulse) if button == 0 => pulse,
            _ => self.native_fire(port, button) || self.binding_fire[target][button],
        };
        if self.fire_level[target][button] != level {
            self.fire_level[target][button] = level;
            out.push(MappedEvent::JoystickButton {
                port: target,
                button: button as u8,
                pressed: level,
            });
        }
    }

    fn process_bindings(&mut self, snapshot: &InputSnapshot, out: &mut Vec<MappedEvent>) {
        for port in 0..2 {
            let profile = self.profiles.profile(port);
            if !profile.uses_bindings() {
                continue;
            }
            let ctx = BindingContext {
                bindings: &self.bindings,
                hotkeys: &self.hotkeys,
                profile,
                overlay_visible: self.vkbd.is_visible(),
                turbo_button: self.turbo.button(),
            };
            let edges = self.pad_bindings.process(port, snapshot.pad(port), &ctx);
            for edge in edges {
                self.apply_binding(edge, out);
            }
        }
    }

    fn apply_binding(&mut self, edge: BindingEdge, out: &mut Vec<MappedEvent>) {
        let BindingEdge {
            port,
            action,
            pressed,
            ..
        } = edge;
        let target = self.target(port);

        match action {
            BindingAction::Function(function) => {
                if pressed {
                    self.apply_function(function, out);
                }
            }
            BindingAction::Key(key) => match self.keyboard.translation().translate(key) {
                Some(emu) => out.push(MappedEvent::key(emu, pressed)),
                None => debug!("Bound key {:?} has no emulated key", key),
            },
            BindingAction::Mouse(button) => {
                if let Some(levels) = self.binding_mouse.get_mut(port) {
                    levels[button.index()] = pressed;
                }
            }
            BindingAction::Slower => {
                if let Some(m) = self.modifiers.get_mut(port) {
                    m.set(SpeedModifiers::SLOWER, pressed);
                }
            }
            BindingAction::Faster => {
                if let Some(m) = self.modifiers.get_mut(port) {
                    m.set(SpeedModifiers::FASTER, pressed);
                }
            }
            BindingAction::Fire | BindingAction::SecondFire => {
                let button = if action == BindingAction::Fire { 0 } else { 1 };
                self.binding_fire[target][button] = pressed;
                self.sync_fire(port, button, out);
            }
        }
    }

    fn process_navigator(
        &mut self,
        snapshot: &InputSnapshot,
        now_ms: u64,
        out: &mut Vec<MappedEvent>,
    ) -> NavigatorOutput {
        if !self.vkbd.is_visible() {
            return NavigatorOutput::default();
        }

        let pad = |c: Control| snapshot.held(0, c) || snapshot.held(1, c);
        // Face buttons with a special binding keep that binding instead
        let aux = |c: Control| pad(c) && self.bindings.is_key_or_unbound(c);
        let key = |k: HostKey| snapshot.keyboard.is_held(k);

        let input = NavigatorInput {
            up: pad(Control::Up) || key(HostKey::UP),
            down: pad(Control::Down) || key(HostKey::DOWN),
            left: pad(Control::Left) || key(HostKey::LEFT),
            right: pad(Control::Right) || key(HostKey::RIGHT),
            activate: aux(Control::B) || key(HostKey::RETURN) || snapshot.pointer.pressed,
            pointer: Some((snapshot.pointer.x, snapshot.pointer.y)),
            start: aux(Control::Start),
            caps: aux(Control::Y),
            position: aux(Control::X),
            transparency: aux(Control::A),
        };

        let output = self.vkbd.step(&input, now_ms, &mut self.caps, out);
        for function in output.functions.iter().copied() {
            self.apply_function(function, out);
        }
        output
    }

    fn process_joystick(&mut self, port: usize, pad: &PadState, out: &mut Vec<MappedEvent>) {
        let profile = self.profiles.profile(port);
        if !profile.is_joystick_like() {
            return;
        }
        let target = self.target(port);
        let overlay = self.vkbd.is_visible();

        if profile != DeviceProfile::AnalogJoystick {
            if !self.alt_jump[target] {
                if let Some(value) = step_axis_gated(
                    &mut self.joystick,
                    target,
                    (Control::Up, pad.held(Control::Up)),
                    (Control::Down, pad.held(Control::Down)),
                    !overlay,
                ) {
                    out.push(MappedEvent::JoystickAxis {
                        port: target,
                        axis: Axis::Vertical,
                        value,
                    });
                }
            }
            if let Some(value) = step_axis_gated(
                &mut self.joystick,
                target,
                (Control::Left, pad.held(Control::Left)),
                (Control::Right, pad.held(Control::Right)),
                !overlay,
            ) {
                out.push(MappedEvent::JoystickAxis {
                    port: target,
                    axis: Axis::Horizontal,
                    value,
                });
            }
        }

        let turbo_button = self.turbo.button();
        for &control in joystick_buttons(profile) {
            if turbo_button == Some(control) {
                continue;
            }
            let held = pad.held(control);
            let keymapped = self.is_keymapped(port, control);

            match self.profiles.map(port, control) {
                ButtonTarget::AltJump => self.alt_jump_control(port, control, held, keymapped, pad, out),
                ButtonTarget::Button(button) => {
                    let latched = self.joystick.is_set(target, control.index());
                    let level = if latched { held } else { held && !overlay };
                    if level == latched {
                        continue;
                    }
                    self.joystick.set(target, control.index(), level);
                    if profile == DeviceProfile::AnalogJoystick {
                        self.analog.set(port, control.index(), level);
                    }
                    if usize::from(button) < SHARED_BUTTONS {
                        self.sync_fire(port, usize::from(button), out);
                    } else if !keymapped {
                        out.push(MappedEvent::JoystickButton {
                            port: target,
                            button,
                            pressed: level,
                        });
                    }
                }
                ButtonTarget::Unbound => {}
            }
        }

        if matches!(
            profile,
            DeviceProfile::RetroPad | DeviceProfile::AnalogJoystick | DeviceProfile::Cd32Pad
        ) {
            if let Some(button) = turbo_button {
                if let Some(level) = self.turbo.tick(port, pad.held(button)) {
                    self.turbo_fire[target] = self.turbo.is_active(port).then_some(level);
                    self.sync_fire(port, 0, out);
                }
            }
        }
    }

    /// Face button acting as an Up-direction jump
    fn alt_jump_control(
        &mut self,
        port: usize,
        control: Control,
        held: bool,
        keymapped: bool,
        pad: &PadState,
        out: &mut Vec<MappedEvent>,
    ) {
        let target = self.target(port);
        let latched = self.alt_jump[target];
        let keymapped = keymapped && self.profiles.profile(port) == DeviceProfile::RetroPad;

        if held && !latched && !self.vkbd.is_visible() {
            if keymapped {
                self.joystick.set(target, control.index(), true);
            } else if !self.joystick.is_set(target, Control::Up.index()) {
                out.push(MappedEvent::JoystickAxis {
                    port: target,
                    axis: Axis::Vertical,
                    value: -1,
                });
            }
            debug!("Alternate jump on port {}", target);
            self.alt_jump[target] = true;
        } else if !held && !pad.held(Control::Up) && latched {
            if keymapped {
                self.joystick.set(target, control.index(), false);
            } else {
                out.push(MappedEvent::JoystickAxis {
                    port: target,
                    axis: Axis::Vertical,
                    value: 0,
                });
            }
            // Let the d-pad re-latch on the next frame
            self.joystick.set(target, Control::Up.index(), false);
            self.joystick.set(target, Control::Down.index(), false);
            self.alt_jump[target] = false;
        }
    }

    fn process_analog_joystick(&mut self, port: usize, stick: StickPosition, out: &mut Vec<MappedEvent>) {
        let target = self.target(port);
        let stick = gate(stick, self.deadzone);
        let forwarded = forwarded_axes(stick, self.deadzone);

        for (slot, axis) in [Axis::Horizontal, Axis::Vertical].into_iter().enumerate() {
            let value = forwarded
                .iter()
                .find_map(|(a, v)| (*a == axis).then_some(*v))
                .unwrap_or(0);
            if self.analog_axes[port][slot] != value {
                self.analog_axes[port][slot] = value;
                out.push(MappedEvent::JoystickAnalog {
                    port: target,
                    axis,
                    value,
                });
            }
        }
        track_directions(&mut self.analog, port, stick, self.deadzone);
    }

    fn process_mouse(
        &mut self,
        snapshot: &InputSnapshot,
        navigator: &NavigatorOutput,
        now_ms: u64,
        out: &mut Vec<MappedEvent>,
    ) {
        let overlay = self.vkbd.is_visible();
        let mice = if self.multi_mouse { MAX_MICE } else { 1 };
        let mut buttons = [[false; 3]; MAX_MICE];
        let mut motion = [(0, 0); MAX_MICE];

        if self.mouse_mode && !overlay {
            for (mouse, levels) in buttons.iter_mut().enumerate() {
                let pad = snapshot.pad(mouse);
                let (left, right) = if self.profiles.layout(mouse).is_rotated() {
                    (Control::Y, Control::B)
                } else {
                    (Control::B, Control::A)
                };
                levels[0] = pad.held(left);
                levels[1] = pad.held(right);
            }
        }
        for (levels, bound) in buttons.iter_mut().zip(self.binding_mouse) {
            for (level, b) in levels.iter_mut().zip(bound) {
                *level |= b;
            }
        }
        if overlay {
            for (level, nav) in buttons[0].iter_mut().zip(navigator.mouse_buttons) {
                *level |= nav;
            }
        } else {
            for (mouse, levels) in buttons.iter_mut().enumerate().take(mice) {
                if !levels[0] && !levels[1] {
                    let host = snapshot.mice[mouse];
                    levels[0] = host.left;
                    levels[1] = host.right;
                    levels[2] |= host.middle;
                }
            }
        }

        for port in 0..MAX_PORTS {
            if self.profiles.profile(port) == DeviceProfile::AnalogJoystick {
                self.process_analog_joystick(port, snapshot.pad(port).stick(Stick::Left), out);
            }
        }

        for (mouse, delta) in motion.iter_mut().enumerate() {
            let profile = self.profiles.profile(mouse);
            let pad = snapshot.pad(mouse);
            let modifiers = self.modifiers[mouse];

            if !overlay && (self.mouse_mode || profile == DeviceProfile::AnalogJoystick) {
                let dirs = DpadDirections {
                    up: pad.held(Control::Up),
                    down: pad.held(Control::Down),
                    left: pad.held(Control::Left),
                    right: pad.held(Control::Right),
                };
                *delta = self.dpad_mouse.step(mouse, dirs, modifiers, now_ms);
            }
            if overlay && mouse == 0 {
                *delta = navigator.mouse_motion;
            }

            if profile != DeviceProfile::AnalogJoystick {
                if self.mouse_stick.uses_left()
                    && *delta == (0, 0)
                    && !self.bindings.any_bound(&LEFT_STICK_DIRECTIONS)
                {
                    let stick = gate(pad.stick(Stick::Left), self.deadzone);
                    *delta = self.curve.motion(stick, self.deadzone, modifiers);
                }
                if self.mouse_stick.uses_right()
                    && *delta == (0, 0)
                    && !self.bindings.any_bound(&RIGHT_STICK_DIRECTIONS)
                {
                    let stick = gate(pad.stick(Stick::Right), self.deadzone);
                    *delta = self.curve.motion(stick, self.deadzone, modifiers);
                }
            }

            if !overlay && mouse < mice && *delta == (0, 0) {
                let host = snapshot.mice[mouse];
                *delta = (host.dx, host.dy);
            }
        }

        for mouse in 0..MAX_MICE {
            for button in MouseButton::ALL {
                let level = buttons[mouse][button.index()];
                if self.mouse_buttons[mouse][button.index()] != level {
                    self.mouse_buttons[mouse][button.index()] = level;
                    self.mouse_flags.set(mouse, mouse_flag(button).index(), level);
                    out.push(MappedEvent::MouseButton {
                        port: mouse,
                        button,
                        pressed: level,
                    });
                }
            }

            let (dx, dy) = motion[mouse];
            self.mouse_flags.set(mouse, Control::Up.index(), dy < 0);
            self.mouse_flags.set(mouse, Control::Down.index(), dy > 0);
            self.mouse_flags.set(mouse, Control::Left.index(), dx < 0);
            self.mouse_flags.set(mouse, Control::Right.index(), dx > 0);
            if dx != 0 || dy != 0 {
                out.push(MappedEvent::MouseMove {
                    port: mouse,
                    dx,
                    dy,
                });
            }
        }
    }

    /// Status readouts by host port
    pub fn status(&self) -> Vec<PortReadout> {
        let mut joystick = ControlTable::new();
        let mut alt_jump = [false; MAX_PORTS];
        for (port, alt) in alt_jump.iter_mut().enumerate() {
            let target = self.target(port);
            for control in 0..CONTROL_COUNT {
                if self.joystick.is_set(target, control) {
                    joystick.set(port, control, true);
                }
            }
            let fire = self.fire_level.get(target).copied().unwrap_or_default();
            if fire[0] {
                joystick.set(port, self.profiles.fire_control(port).index(), true);
            }
            if fire[1] {
                joystick.set(port, self.profiles.second_fire_control(port).index(), true);
            }
            *alt = self.alt_jump.get(target).copied().unwrap_or(false);
        }

        StatusTables {
            profiles: &self.profiles,
            joystick: &joystick,
            alt_jump,
            mouse: &self.mouse_flags,
            analog: &self.analog,
            keypad: self.keypad.flags(),
            mouse_mode: self.mouse_mode,
            keypad_enabled: self.keypad_enabled,
        }
        .readouts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurboConfig;
    use crate::controller::snapshot::HostMouseState;
    use crate::mapping::hotkey::{Binding, ControlBinding};
    use crate::mapping::keyboard::EmuKey;
    use crate::mapping::profile::FaceLayout;
    use crate::mapping::vkbd::{NavigatorPhase, STICKY_HOLD_MS};

    fn config() -> MapperConfig {
        MapperConfig {
            bindings: Vec::new(),
            ..MapperConfig::default()
        }
    }

    fn idle() -> InputSnapshot {
        InputSnapshot::default()
    }

    fn button_events(events: &[MappedEvent]) -> Vec<(usize, u8, bool)> {
        events
            .iter()
            .filter_map(|e| match e {
                MappedEvent::JoystickButton {
                    port,
                    button,
                    pressed,
                } => Some((*port, *button, *pressed)),
                _ => None,
            })
            .collect()
    }

    fn key_events(events: &[MappedEvent]) -> Vec<&MappedEvent> {
        events
            .iter()
            .filter(|e| matches!(e, MappedEvent::Key { .. }))
            .collect()
    }

    #[test]
    fn held_button_emits_one_press_and_one_release() {
        let mut mapper = InputMapper::new(&config());
        let held = idle().with_button(0, Control::B);

        let mut events = Vec::new();
        for frame in 0..5 {
            events.extend(mapper.process_frame(&held, frame * 20));
        }
        assert_eq!(button_events(&events), vec![(0, 0, true)]);

        let released = mapper.process_frame(&idle(), 100);
        assert_eq!(button_events(&released), vec![(0, 0, false)]);
        assert!(button_events(&mapper.process_frame(&idle(), 120)).is_empty());
    }

    #[test]
    fn port_order_redirects_output() {
        let mut cfg = config();
        cfg.port_order = [1, 0, 2, 3];
        let mut mapper = InputMapper::new(&cfg);

        let events = mapper.process_frame(&idle().with_button(0, Control::Right), 0);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAxis {
                port: 1,
                axis: Axis::Horizontal,
                value: 1
            }]
        );
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut mapper = InputMapper::new(&config());
        let both = idle()
            .with_button(0, Control::Left)
            .with_button(0, Control::Right);
        assert!(mapper.process_frame(&both, 0).is_empty());

        let left = idle().with_button(0, Control::Left);
        let events = mapper.process_frame(&left, 20);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAxis {
                port: 0,
                axis: Axis::Horizontal,
                value: -1
            }]
        );
        // Right joins but left stays latched
        assert!(mapper.process_frame(&both, 40).is_empty());
    }

    #[test]
    fn turbo_alternates_and_releases_once() {
        let mut cfg = config();
        cfg.turbo = TurboConfig {
            button: Some(Control::R2),
            pulse: 2,
            enabled: true,
        };
        let mut mapper = InputMapper::new(&cfg);
        let held = idle().with_button(0, Control::R2);

        let levels: Vec<bool> = (0..6)
            .flat_map(|frame| button_events(&mapper.process_frame(&held, frame * 20)))
            .map(|(_, _, pressed)| pressed)
            .collect();
        assert_eq!(levels, vec![true, false, true, false, true, false]);

        // Release while on forces one release
        mapper.process_frame(&held, 200);
        let release = mapper.process_frame(&idle(), 220);
        assert_eq!(button_events(&release), vec![(0, 0, false)]);
        assert!(button_events(&mapper.process_frame(&idle(), 240)).is_empty());
    }

    fn turbo_config() -> MapperConfig {
        let mut cfg = config();
        cfg.turbo = TurboConfig {
            button: Some(Control::R2),
            pulse: 2,
            enabled: true,
        };
        cfg
    }

    #[test]
    fn turbo_owns_fire_while_pad_holds_it() {
        let mut mapper = InputMapper::new(&turbo_config());
        let fire = idle().with_button(0, Control::B);
        let both = fire.clone().with_button(0, Control::R2);
        let released = idle();

        let frames = [&fire, &both, &both, &both, &fire, &released];
        let edges: Vec<(usize, u8, bool)> = frames
            .iter()
            .enumerate()
            .flat_map(|(frame, snap)| {
                button_events(&mapper.process_frame(snap, frame as u64 * 20))
            })
            .collect();
        assert_eq!(
            edges,
            vec![(0, 0, true), (0, 0, false), (0, 0, true), (0, 0, false)]
        );
    }

    #[test]
    fn binding_fire_shares_pad_fire() {
        let mut cfg = config();
        cfg.bindings = vec![ControlBinding {
            control: Control::L,
            action: Binding::JoystickFire,
        }];
        let mut mapper = InputMapper::new(&cfg);
        let fire = idle().with_button(0, Control::B);

        assert_eq!(button_events(&mapper.process_frame(&fire, 0)), vec![(0, 0, true)]);
        let both = fire.with_button(0, Control::L);
        assert!(button_events(&mapper.process_frame(&both, 20)).is_empty());
        let bound = idle().with_button(0, Control::L);
        assert!(button_events(&mapper.process_frame(&bound, 40)).is_empty());
        assert_eq!(
            button_events(&mapper.process_frame(&idle(), 60)),
            vec![(0, 0, false)]
        );
    }

    #[test]
    fn joy_mouse_toggle_releases_turbo_fire() {
        let mut cfg = turbo_config();
        cfg.hotkeys.toggle_joy_mouse = Some(HostKey::F1);
        let mut mapper = InputMapper::new(&cfg);
        let turbo = idle().with_button(0, Control::R2);

        assert_eq!(button_events(&mapper.process_frame(&turbo, 0)), vec![(0, 0, true)]);
        let toggle = turbo.clone().with_key(HostKey::F1);
        assert_eq!(
            button_events(&mapper.process_frame(&toggle, 20)),
            vec![(0, 0, false)]
        );
        assert!(mapper.mouse_mode());

        for frame in 2..10 {
            assert!(button_events(&mapper.process_frame(&idle(), frame * 20)).is_empty());
        }
        assert_eq!(mapper.status()[0].label, "M1");
    }

    #[test]
    fn turbo_button_is_not_mapped_normally() {
        let mut cfg = config();
        cfg.turbo = TurboConfig {
            button: Some(Control::A),
            pulse: 4,
            enabled: true,
        };
        let mut mapper = InputMapper::new(&cfg);
        let events = mapper.process_frame(&idle().with_button(0, Control::A), 0);
        // Only the turbo fire, never button 1
        assert_eq!(button_events(&events), vec![(0, 0, true)]);
    }

    #[test]
    fn hotkey_suppresses_its_key_for_the_frame() {
        let mut cfg = config();
        cfg.hotkeys.toggle_statusbar = Some(HostKey::letter(2));
        let mut mapper = InputMapper::new(&cfg);
        let held = idle().with_key(HostKey::letter(2));

        let events = mapper.process_frame(&held, 0);
        assert_eq!(
            events,
            vec![MappedEvent::Command(EmuFunction::ToggleStatusbar)]
        );
        assert!(!mapper.is_statusbar_visible());

        assert!(mapper.process_frame(&held, 20).is_empty());
        assert!(mapper.process_frame(&idle(), 40).is_empty());
    }

    #[test]
    fn pad_buttons_suppress_keyboard() {
        let mut mapper = InputMapper::new(&config());
        let snap = idle()
            .with_button(0, Control::L2)
            .with_key(HostKey::SPACE);
        let events = mapper.process_frame(&snap, 0);
        assert!(key_events(&events).is_empty());
        assert_eq!(mapper.keyboard_mode(), KeyboardMode::SkipKeyboard);

        let events = mapper.process_frame(&idle().with_key(HostKey::SPACE), 20);
        assert_eq!(key_events(&events), vec![&MappedEvent::key(EmuKey::SPACE, true)]);
    }

    #[test]
    fn keymapped_face_button_skips_joystick() {
        let mut cfg = config();
        cfg.bindings = vec![ControlBinding {
            control: Control::A,
            action: Binding::Key(HostKey::SPACE),
        }];
        let mut mapper = InputMapper::new(&cfg);

        let events = mapper.process_frame(&idle().with_button(0, Control::A), 0);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::SPACE, true)]);
        let events = mapper.process_frame(&idle(), 20);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::SPACE, false)]);
    }

    #[test]
    fn binding_fire_and_mouse_buttons() {
        let mut cfg = config();
        cfg.bindings = vec![
            ControlBinding {
                control: Control::L,
                action: Binding::JoystickFire,
            },
            ControlBinding {
                control: Control::R,
                action: Binding::MouseRight,
            },
        ];
        let mut mapper = InputMapper::new(&cfg);
        let snap = idle().with_button(1, Control::L).with_button(1, Control::R);
        let events = mapper.process_frame(&snap, 0);
        assert!(events.contains(&MappedEvent::JoystickButton {
            port: 1,
            button: 0,
            pressed: true
        }));
        assert!(events.contains(&MappedEvent::MouseButton {
            port: 1,
            button: MouseButton::Right,
            pressed: true
        }));

        let events = mapper.process_frame(&idle(), 20);
        assert!(events.contains(&MappedEvent::JoystickButton {
            port: 1,
            button: 0,
            pressed: false
        }));
        assert!(events.contains(&MappedEvent::MouseButton {
            port: 1,
            button: MouseButton::Right,
            pressed: false
        }));
    }

    #[test]
    fn alternate_jump_latches_up() {
        let mut cfg = config();
        cfg.retropad_layout = FaceLayout::Jump;
        let mut mapper = InputMapper::new(&cfg);

        let events = mapper.process_frame(&idle().with_button(0, Control::A), 0);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAxis {
                port: 0,
                axis: Axis::Vertical,
                value: -1
            }]
        );
        assert_eq!(mapper.status()[0].cells[1].symbol, '↑');

        // Down is ignored while the jump holds the vertical axis
        let both = idle().with_button(0, Control::A).with_button(0, Control::Down);
        assert!(mapper.process_frame(&both, 20).is_empty());

        let events = mapper.process_frame(&idle(), 40);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAxis {
                port: 0,
                axis: Axis::Vertical,
                value: 0
            }]
        );
    }

    #[test]
    fn joy_mouse_toggle_releases_joystick() {
        let mut cfg = config();
        cfg.hotkeys.toggle_joy_mouse = Some(HostKey::F1);
        let mut mapper = InputMapper::new(&cfg);
        mapper.process_frame(&idle().with_button(0, Control::B), 0);

        let snap = idle().with_button(0, Control::B).with_key(HostKey::F1);
        let events = mapper.process_frame(&snap, 20);
        assert!(mapper.mouse_mode());
        assert!(events.contains(&MappedEvent::JoystickButton {
            port: 0,
            button: 0,
            pressed: false
        }));
        // B is now the left mouse button
        assert!(events.contains(&MappedEvent::MouseButton {
            port: 0,
            button: MouseButton::Left,
            pressed: true
        }));
        assert_eq!(mapper.status()[0].label, "M1");
    }

    #[test]
    fn mouse_mode_dpad_moves_pointer() {
        let mut cfg = config();
        cfg.profiles[0] = DeviceProfile::Mouse;
        cfg.dpad_mouse_speed = 4;
        let mut mapper = InputMapper::new(&cfg);
        assert!(mapper.mouse_mode());

        let events = mapper.process_frame(&idle().with_button(0, Control::Right), 0);
        assert_eq!(
            events,
            vec![MappedEvent::MouseMove {
                port: 0,
                dx: 4,
                dy: 0
            }]
        );
    }

    #[test]
    fn analog_stick_moves_mouse_unless_bound() {
        let mut mapper = InputMapper::new(&config());
        let snap = idle().with_stick(0, Stick::Left, 32767, 0);
        let events = mapper.process_frame(&snap, 0);
        assert_eq!(
            events,
            vec![MappedEvent::MouseMove {
                port: 0,
                dx: 6,
                dy: 0
            }]
        );

        let mut cfg = config();
        cfg.bindings = vec![ControlBinding {
            control: Control::LeftStickRight,
            action: Binding::Key(HostKey::SPACE),
        }];
        let mut mapper = InputMapper::new(&cfg);
        let events = mapper.process_frame(&snap, 0);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::SPACE, true)]);
    }

    #[test]
    fn analog_joystick_forwards_axes() {
        let mut cfg = config();
        cfg.profiles[1] = DeviceProfile::AnalogJoystick;
        let mut mapper = InputMapper::new(&cfg);

        let events = mapper.process_frame(&idle().with_stick(1, Stick::Left, 0, -20000), 0);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAnalog {
                port: 1,
                axis: Axis::Vertical,
                value: -20000
            }]
        );
        assert_eq!(mapper.status()[1].label, "A2");

        let events = mapper.process_frame(&idle(), 20);
        assert_eq!(
            events,
            vec![MappedEvent::JoystickAnalog {
                port: 1,
                axis: Axis::Vertical,
                value: 0
            }]
        );
    }

    #[test]
    fn host_mouse_passes_through() {
        let mut mapper = InputMapper::new(&config());
        let snap = idle().with_mouse(
            0,
            HostMouseState {
                dx: -3,
                dy: 2,
                left: true,
                ..HostMouseState::default()
            },
        );
        let events = mapper.process_frame(&snap, 0);
        assert_eq!(
            events,
            vec![
                MappedEvent::MouseButton {
                    port: 0,
                    button: MouseButton::Left,
                    pressed: true
                },
                MappedEvent::MouseMove {
                    port: 0,
                    dx: -3,
                    dy: 2
                }
            ]
        );

        // Second mouse only with multi-mouse
        let second = idle().with_mouse(
            1,
            HostMouseState {
                dx: 5,
                ..HostMouseState::default()
            },
        );
        assert!(mapper.process_frame(&second, 20).iter().all(|e| !matches!(
            e,
            MappedEvent::MouseMove { port: 1, .. }
        )));
    }

    fn with_overlay() -> InputMapper {
        let mut cfg = config();
        cfg.bindings = vec![ControlBinding {
            control: Control::Select,
            action: Binding::Emu(EmuFunction::ToggleVkbd),
        }];
        let mut mapper = InputMapper::new(&cfg);
        mapper.process_frame(&idle().with_button(0, Control::Select), 0);
        mapper.process_frame(&idle(), 20);
        assert!(mapper.is_overlay_visible());
        mapper
    }

    #[test]
    fn overlay_takes_directions_and_face_buttons() {
        let mut mapper = with_overlay();

        let events = mapper.process_frame(&idle().with_button(0, Control::Right), 40);
        assert!(events.is_empty());
        assert_eq!(mapper.virtual_keyboard().cursor(), (1, 0));

        mapper.process_frame(&idle(), 60);
        let events = mapper.process_frame(&idle().with_button(1, Control::B), 80);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::function(1), true)]);
        let events = mapper.process_frame(&idle(), 100);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::function(1), false)]);
    }

    #[test]
    fn pointer_selects_and_activates_overlay_key() {
        let mut mapper = with_overlay();

        let press = idle().with_pointer(32767, 32767, true);
        let events = mapper.process_frame(&press, 40);
        assert_eq!(mapper.virtual_keyboard().cursor(), (10, 5));
        assert_eq!(events, vec![MappedEvent::key(EmuKey::CURSOR_RIGHT, true)]);

        let release = idle().with_pointer(32767, 32767, false);
        let events = mapper.process_frame(&release, 60);
        assert_eq!(events, vec![MappedEvent::key(EmuKey::CURSOR_RIGHT, false)]);
    }

    #[test]
    fn sticky_keys_through_the_mapper() {
        let mut mapper = with_overlay();
        let activate = idle().with_key(HostKey::RETURN);

        let mut now = 100;
        let mut evicted = Vec::new();
        for _ in 0..3 {
            mapper.process_frame(&activate, now);
            now += STICKY_HOLD_MS + 1;
            evicted.extend(key_events(&mapper.process_frame(&activate, now)).into_iter().cloned());
            assert_eq!(mapper.virtual_keyboard().phase(), NavigatorPhase::Sticky);
            now += 20;
            mapper.process_frame(&idle(), now);
            now += 20;
            mapper.process_frame(&idle().with_key(HostKey::RIGHT), now);
            now += 20;
            mapper.process_frame(&idle(), now);
            now += 20;
        }
        assert_eq!(
            mapper.virtual_keyboard().sticky_keys(),
            vec![EmuKey::function(1), EmuKey::function(2)]
        );
        assert_eq!(evicted, vec![MappedEvent::key(EmuKey::ESCAPE, false)]);

        let events = mapper.process_frame(&idle().with_button(0, Control::Select), now);
        assert!(events.contains(&MappedEvent::key(EmuKey::function(1), false)));
        assert!(events.contains(&MappedEvent::key(EmuKey::function(2), false)));
        assert!(!mapper.is_overlay_visible());
    }

    #[test]
    fn status_lists_assigned_ports() {
        let mut cfg = config();
        cfg.profiles[3] = DeviceProfile::Joystick;
        let mapper = InputMapper::new(&cfg);
        let labels: Vec<String> = mapper.status().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["J1", "J2", "J4"]);
    }
}
