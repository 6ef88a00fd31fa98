//! On-screen virtual keyboard navigator
//!
//! While the overlay is visible the navigator owns the pad directions and
//! the activation control of ports 0 and 1. It moves a cursor over a fixed
//! grid, resolves the cell under it and emits keyboard, mouse and overlay
//! events. Holding a normal key long enough latches it into one of two
//! sticky slots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::hotkey::EmuFunction;
use super::keyboard::{CapsLock, EmuKey};
use super::{MappedEvent, MouseButton, OverlayCommand};

pub const VKBD_COLUMNS: usize = 11;
pub const VKBD_ROWS: usize = 6;
pub const VKBD_PAGES: usize = 2;

/// Hold time before a direction starts repeating
pub const MOVE_INITIAL_DELAY_MS: u64 = 200;
/// Repeat interval of a held direction
pub const MOVE_REPEAT_MS: u64 = 50;
/// Hold time that latches a key as sticky
pub const STICKY_HOLD_MS: u64 = 1000;
/// Acceleration step of the overlay mouse keys
pub const MOUSE_ACCEL_MS: u64 = 100;
pub const MOUSE_SPEED_INITIAL: i32 = 3;

const STICKY_SLOTS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self, amount: i32) -> (i32, i32) {
        match self {
            Direction::Up => (0, -amount),
            Direction::Down => (0, amount),
            Direction::Left => (-amount, 0),
            Direction::Right => (amount, 0),
        }
    }
}

/// Content of one grid cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VkeyAction {
    Key(EmuKey),
    NoOp,
    PageFlip,
    /// Continuous while held
    MouseMove(Direction),
    /// Held while activation is held
    MouseButton(MouseButton),
    ToggleJoyMouse,
    ToggleTurbo,
    Reset,
    ToggleStatusbar,
    ToggleAspectRatio,
}

/// Grid contents of both pages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VkbdLayout {
    pages: [[[VkeyAction; VKBD_COLUMNS]; VKBD_ROWS]; VKBD_PAGES],
}

impl Default for VkbdLayout {
    fn default() -> Self {
        use VkeyAction::{Key, NoOp, PageFlip};
        let k = Key;
        let l = |c| Key(EmuKey::letter(c));
        let d = |n| Key(EmuKey::digit(n));
        let f = |n| Key(EmuKey::function(n));

        let bottom = [
            PageFlip,
            k(EmuKey::CTRL),
            k(EmuKey::LALT),
            k(EmuKey::LAMIGA),
            k(EmuKey::SPACE),
            k(EmuKey::SPACE),
            k(EmuKey::SPACE),
            k(EmuKey::RAMIGA),
            k(EmuKey::CURSOR_LEFT),
            k(EmuKey::CURSOR_DOWN),
            k(EmuKey::CURSOR_RIGHT),
        ];

        let main = [
            [
                k(EmuKey::ESCAPE),
                f(1),
                f(2),
                f(3),
                f(4),
                f(5),
                f(6),
                f(7),
                f(8),
                f(9),
                f(10),
            ],
            [
                d(1),
                d(2),
                d(3),
                d(4),
                d(5),
                d(6),
                d(7),
                d(8),
                d(9),
                d(0),
                k(EmuKey::BACKSPACE),
            ],
            [
                k(EmuKey::TAB),
                l('Q'),
                l('W'),
                l('E'),
                l('R'),
                l('T'),
                l('Y'),
                l('U'),
                l('I'),
                l('O'),
                l('P'),
            ],
            [
                k(EmuKey::CAPSLOCK),
                l('A'),
                l('S'),
                l('D'),
                l('F'),
                l('G'),
                l('H'),
                l('J'),
                l('K'),
                l('L'),
                k(EmuKey::RETURN),
            ],
            [
                k(EmuKey::LSHIFT),
                l('Z'),
                l('X'),
                l('C'),
                l('V'),
                l('B'),
                l('N'),
                l('M'),
                k(EmuKey::COMMA),
                k(EmuKey::PERIOD),
                k(EmuKey::CURSOR_UP),
            ],
            bottom,
        ];

        let mv = VkeyAction::MouseMove;
        let mb = VkeyAction::MouseButton;
        let extra = [
            [
                k(EmuKey::BACKQUOTE),
                k(EmuKey::MINUS),
                k(EmuKey::EQUALS),
                k(EmuKey::BACKSLASH),
                k(EmuKey::LEFTBRACKET),
                k(EmuKey::RIGHTBRACKET),
                k(EmuKey::SEMICOLON),
                k(EmuKey::QUOTE),
                k(EmuKey::SLASH),
                k(EmuKey::DELETE),
                k(EmuKey::BACKSPACE),
            ],
            [
                k(EmuKey::KP7),
                k(EmuKey::KP8),
                k(EmuKey::KP9),
                NoOp,
                mb(MouseButton::Left),
                mv(Direction::Up),
                mb(MouseButton::Right),
                NoOp,
                VkeyAction::ToggleStatusbar,
                VkeyAction::ToggleAspectRatio,
                VkeyAction::Reset,
            ],
            [
                k(EmuKey::KP4),
                k(EmuKey::KP5),
                k(EmuKey::KP6),
                NoOp,
                mv(Direction::Left),
                mb(MouseButton::Middle),
                mv(Direction::Right),
                NoOp,
                VkeyAction::ToggleJoyMouse,
                VkeyAction::ToggleTurbo,
                NoOp,
            ],
            [
                k(EmuKey::KP1),
                k(EmuKey::KP2),
                k(EmuKey::KP3),
                NoOp,
                NoOp,
                mv(Direction::Down),
                NoOp,
                NoOp,
                k(EmuKey::RSHIFT),
                k(EmuKey::RALT),
                k(EmuKey::RETURN),
            ],
            [
                k(EmuKey::KP0),
                k(EmuKey::KP0),
                k(EmuKey::KP_ENTER),
                NoOp,
                NoOp,
                NoOp,
                NoOp,
                NoOp,
                NoOp,
                NoOp,
                k(EmuKey::CURSOR_UP),
            ],
            bottom,
        ];

        Self {
            pages: [main, extra],
        }
    }
}

impl VkbdLayout {
    pub fn cell(&self, page: usize, x: usize, y: usize) -> VkeyAction {
        self.pages
            .get(page)
            .and_then(|p| p.get(y))
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(VkeyAction::NoOp)
    }
}

/// Screen size and overlay rectangle used for pointer hit-testing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayGeometry {
    pub screen_width: i32,
    pub screen_height: i32,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Default for OverlayGeometry {
    fn default() -> Self {
        Self {
            screen_width: 720,
            screen_height: 568,
            x_min: 0,
            x_max: 720,
            y_min: 284,
            y_max: 568,
        }
    }
}

impl OverlayGeometry {
    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min
            || self.y_max <= self.y_min
            || self.screen_width <= 0
            || self.screen_height <= 0
    }

    /// Grid cell under an absolute pointer position, if inside the overlay
    pub fn hit_test(&self, pointer_x: i32, pointer_y: i32) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let px = (pointer_x as i64 + 0x7fff) * self.screen_width as i64 / 0xffff;
        let py = (pointer_y as i64 + 0x7fff) * self.screen_height as i64 / 0xffff;
        let (px, py) = (px as i32, py as i32);
        if px < self.x_min || px > self.x_max || py < self.y_min || py > self.y_max {
            return None;
        }

        let cell_w = (self.x_max - self.x_min) as f32 / VKBD_COLUMNS as f32;
        let cell_h = (self.y_max - self.y_min) as f32 / VKBD_ROWS as f32;
        let x = ((px - self.x_min) as f32 / cell_w) as usize;
        let y = ((py - self.y_min) as f32 / cell_h) as usize;
        Some((x.min(VKBD_COLUMNS - 1), y.min(VKBD_ROWS - 1)))
    }
}

/// Navigator phase, derived from its state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigatorPhase {
    Hidden,
    Navigating,
    KeyHeld,
    Sticky,
}

/// Inputs gathered by the mapper for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigatorInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub activate: bool,
    /// Absolute pointer position
    pub pointer: Option<(i32, i32)>,
    pub start: bool,
    pub caps: bool,
    pub position: bool,
    pub transparency: bool,
}

/// Effects of one frame besides key events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigatorOutput {
    pub functions: Vec<EmuFunction>,
    pub mouse_motion: (i32, i32),
    /// Held levels of left, right and middle button
    pub mouse_buttons: [bool; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeldCell {
    action: VkeyAction,
    since: u64,
    shifted: bool,
    promoted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StickySlot {
    key: EmuKey,
    shifted: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct AuxLatches {
    start: bool,
    caps: bool,
    position: bool,
    transparency: bool,
}

#[derive(Clone, Debug)]
pub struct VirtualKeyboard {
    layout: VkbdLayout,
    geometry: OverlayGeometry,
    sticky_enabled: bool,

    visible: bool,
    page: usize,
    cursor: (usize, usize),

    dirs: [bool; 4],
    direction_released: bool,
    last_press: u64,
    last_move: u64,
    last_pointer: (i32, i32),

    activation_held: bool,
    held: Option<HeldCell>,
    sticky: VecDeque<StickySlot>,
    mouse_speed: i32,
    mouse_accel_at: u64,
    aux: AuxLatches,

    position_toggled: bool,
    transparent: bool,
}

impl VirtualKeyboard {
    pub fn new(layout: VkbdLayout, geometry: OverlayGeometry, sticky_enabled: bool) -> Self {
        Self {
            layout,
            geometry,
            sticky_enabled,
            visible: false,
            page: 0,
            cursor: (0, 0),
            dirs: [false; 4],
            direction_released: true,
            last_press: 0,
            last_move: 0,
            last_pointer: (0, 0),
            activation_held: false,
            held: None,
            sticky: VecDeque::with_capacity(STICKY_SLOTS),
            mouse_speed: MOUSE_SPEED_INITIAL,
            mouse_accel_at: 0,
            aux: AuxLatches::default(),
            position_toggled: false,
            transparent: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn current_action(&self) -> VkeyAction {
        self.layout.cell(self.page, self.cursor.0, self.cursor.1)
    }

    /// Latched sticky keys, oldest first
    pub fn sticky_keys(&self) -> Vec<EmuKey> {
        self.sticky.iter().map(|s| s.key).collect()
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn is_position_toggled(&self) -> bool {
        self.position_toggled
    }

    pub fn phase(&self) -> NavigatorPhase {
        if !self.visible {
            return NavigatorPhase::Hidden;
        }
        match self.held {
            Some(held) if held.promoted => NavigatorPhase::Sticky,
            Some(_) => NavigatorPhase::KeyHeld,
            None => NavigatorPhase::Navigating,
        }
    }

    pub fn show(&mut self) {
        if self.visible {
            return;
        }
        info!("Virtual keyboard shown");
        self.visible = true;
        self.dirs = [false; 4];
        self.direction_released = true;
        // Activation held while opening must be released first
        self.activation_held = true;
        self.held = None;
    }

    /// Hides the overlay and releases everything it holds
    pub fn hide(&mut self, out: &mut Vec<MappedEvent>) {
        if !self.visible {
            return;
        }
        info!("Virtual keyboard hidden");
        if let Some(held) = self.held.take() {
            if let VkeyAction::Key(key) = held.action {
                if !held.promoted && key != EmuKey::CAPSLOCK {
                    CapsLock::release(key, held.shifted, out);
                }
            }
        }
        while let Some(slot) = self.sticky.pop_front() {
            debug!("Releasing sticky key {:?}", slot.key);
            CapsLock::release(slot.key, slot.shifted, out);
        }
        if self.aux.start {
            out.push(MappedEvent::key(EmuKey::RETURN, false));
        }
        self.aux = AuxLatches::default();
        self.activation_held = false;
        self.mouse_speed = MOUSE_SPEED_INITIAL;
        self.visible = false;
    }

    pub fn toggle(&mut self, out: &mut Vec<MappedEvent>) {
        if self.visible {
            self.hide(out);
        } else {
            self.show();
        }
    }

    fn move_cursor(&mut self) {
        let (mut x, mut y) = (self.cursor.0 as i32, self.cursor.1 as i32);
        let [up, down, left, right] = self.dirs;
        if up {
            y -= 1;
        } else if down {
            y += 1;
        }
        if left {
            x -= 1;
        } else if right {
            x += 1;
        }
        self.cursor = (
            x.rem_euclid(VKBD_COLUMNS as i32) as usize,
            y.rem_euclid(VKBD_ROWS as i32) as usize,
        );
    }

    fn navigate(&mut self, input: &NavigatorInput, now_ms: u64) {
        self.dirs = if self.activation_held {
            [false; 4]
        } else {
            [input.up, input.down, input.left, input.right]
        };

        if self.dirs.iter().any(|d| *d) {
            if self.direction_released {
                self.last_press = now_ms;
                self.move_cursor();
                self.last_move = now_ms;
            } else if now_ms.saturating_sub(self.last_press) > MOVE_INITIAL_DELAY_MS
                && now_ms.saturating_sub(self.last_move) > MOVE_REPEAT_MS
            {
                self.move_cursor();
                self.last_move = now_ms;
            }
            self.direction_released = false;
        } else {
            self.direction_released = true;
        }

        if let Some((px, py)) = input.pointer {
            // A zero coordinate on either axis reads as no pointer
            if px != 0 && py != 0 && (px, py) != self.last_pointer {
                self.last_pointer = (px, py);
                if let Some(cell) = self.geometry.hit_test(px, py) {
                    self.cursor = cell;
                }
            }
        }
    }

    fn auxiliary(&mut self, input: &NavigatorInput, caps: &mut CapsLock, out: &mut Vec<MappedEvent>) {
        if input.start != self.aux.start {
            self.aux.start = input.start;
            out.push(MappedEvent::key(EmuKey::RETURN, input.start));
        }
        if input.caps != self.aux.caps {
            self.aux.caps = input.caps;
            if input.caps {
                caps.flip();
            }
        }
        if input.position != self.aux.position {
            self.aux.position = input.position;
            if input.position {
                self.position_toggled = !self.position_toggled;
                out.push(MappedEvent::Overlay(OverlayCommand::TogglePosition));
            }
        }
        if input.transparency != self.aux.transparency {
            self.aux.transparency = input.transparency;
            if input.transparency {
                self.transparent = !self.transparent;
                out.push(MappedEvent::Overlay(OverlayCommand::ToggleTransparency));
            }
        }
    }

    fn press(
        &mut self,
        now_ms: u64,
        caps: &mut CapsLock,
        out: &mut Vec<MappedEvent>,
        output: &mut NavigatorOutput,
    ) {
        let action = self.current_action();
        debug!("Virtual key {:?} at {:?}", action, self.cursor);
        let mut held = HeldCell {
            action,
            since: now_ms,
            shifted: false,
            promoted: false,
        };

        match action {
            VkeyAction::NoOp => {}
            VkeyAction::PageFlip => self.page = (self.page + 1) % VKBD_PAGES,
            VkeyAction::MouseMove(direction) => {
                self.mouse_speed = MOUSE_SPEED_INITIAL;
                self.mouse_accel_at = now_ms;
                output.mouse_motion = direction.delta(MOUSE_SPEED_INITIAL);
            }
            VkeyAction::MouseButton(button) => output.mouse_buttons[button.index()] = true,
            VkeyAction::ToggleJoyMouse => output.functions.push(EmuFunction::ToggleJoyMouse),
            VkeyAction::ToggleTurbo => output.functions.push(EmuFunction::ToggleTurbo),
            VkeyAction::Reset => output.functions.push(EmuFunction::Reset),
            VkeyAction::ToggleStatusbar => output.functions.push(EmuFunction::ToggleStatusbar),
            VkeyAction::ToggleAspectRatio => {
                output.functions.push(EmuFunction::ToggleAspectRatio)
            }
            VkeyAction::Key(EmuKey::CAPSLOCK) => caps.tap(out),
            VkeyAction::Key(key) => {
                if let Some(pos) = self.sticky.iter().position(|s| s.key == key) {
                    if let Some(slot) = self.sticky.remove(pos) {
                        info!("Sticky key {:?} released", key);
                        CapsLock::release(slot.key, slot.shifted, out);
                    }
                    // Consumed by the unlatch
                    held.action = VkeyAction::NoOp;
                } else {
                    held.shifted = caps.press(key, out);
                }
            }
        }
        self.held = Some(held);
    }

    fn hold(&mut self, now_ms: u64, out: &mut Vec<MappedEvent>, output: &mut NavigatorOutput) {
        let sticky_enabled = self.sticky_enabled;
        let Some(held) = self.held.as_mut() else {
            return;
        };
        let action = held.action;
        match action {
            VkeyAction::MouseMove(direction) => {
                if now_ms.saturating_sub(self.mouse_accel_at) > MOUSE_ACCEL_MS {
                    self.mouse_speed += 1;
                    self.mouse_accel_at = now_ms;
                }
                output.mouse_motion = direction.delta(self.mouse_speed);
            }
            VkeyAction::MouseButton(button) => output.mouse_buttons[button.index()] = true,
            VkeyAction::Key(key)
                if key != EmuKey::CAPSLOCK
                    && sticky_enabled
                    && !held.promoted
                    && now_ms.saturating_sub(held.since) > STICKY_HOLD_MS =>
            {
                held.promoted = true;
                let slot = StickySlot {
                    key,
                    shifted: held.shifted,
                };
                if self.sticky.len() == STICKY_SLOTS {
                    if let Some(evicted) = self.sticky.pop_front() {
                        info!("Sticky key {:?} evicted", evicted.key);
                        CapsLock::release(evicted.key, evicted.shifted, out);
                    }
                }
                info!("Sticky key {:?} latched", key);
                self.sticky.push_back(slot);
            }
            _ => {}
        }
    }

    fn release(&mut self, out: &mut Vec<MappedEvent>) {
        let Some(held) = self.held.take() else {
            return;
        };
        match held.action {
            VkeyAction::Key(key) if key != EmuKey::CAPSLOCK && !held.promoted => {
                CapsLock::release(key, held.shifted, out);
            }
            VkeyAction::MouseMove(_) => self.mouse_speed = MOUSE_SPEED_INITIAL,
            _ => {}
        }
    }

    /// Runs one frame; key and overlay events go to `out`
    pub fn step(
        &mut self,
        input: &NavigatorInput,
        now_ms: u64,
        caps: &mut CapsLock,
        out: &mut Vec<MappedEvent>,
    ) -> NavigatorOutput {
        let mut output = NavigatorOutput::default();
        if !self.visible {
            return output;
        }

        self.navigate(input, now_ms);
        self.auxiliary(input, caps, out);

        match (self.activation_held, input.activate) {
            (false, true) => {
                self.activation_held = true;
                self.press(now_ms, caps, out, &mut output);
            }
            (true, true) => self.hold(now_ms, out, &mut output),
            (true, false) => {
                self.activation_held = false;
                self.release(out);
            }
            (false, false) => {}
        }
        output
    }
}
