//! Emulated keyboard: key codes, host translation and physical pass-through
//!
//! Physical keys are translated through [`KeyTranslation`] and forwarded as
//! [`MappedEvent::Key`]. Each host key keeps its own latch so that a key-up is
//! only ever emitted after a matching key-down.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::controller::keys::{HostKey, HOST_KEY_COUNT};
use crate::controller::snapshot::{Control, KeyboardMatrix};

use super::analog::Axis;
use super::edge::{ControlTable, Edge};
use super::hotkey::KeyboardMode;
use super::MappedEvent;

/// Raw key code of the emulated keyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmuKey(pub u8);

impl EmuKey {
    pub const BACKQUOTE: EmuKey = EmuKey(0x00);
    pub const MINUS: EmuKey = EmuKey(0x0B);
    pub const EQUALS: EmuKey = EmuKey(0x0C);
    pub const BACKSLASH: EmuKey = EmuKey(0x0D);
    pub const KP0: EmuKey = EmuKey(0x0F);
    pub const LEFTBRACKET: EmuKey = EmuKey(0x1A);
    pub const RIGHTBRACKET: EmuKey = EmuKey(0x1B);
    pub const KP1: EmuKey = EmuKey(0x1D);
    pub const KP2: EmuKey = EmuKey(0x1E);
    pub const KP3: EmuKey = EmuKey(0x1F);
    pub const SEMICOLON: EmuKey = EmuKey(0x29);
    pub const QUOTE: EmuKey = EmuKey(0x2A);
    pub const KP4: EmuKey = EmuKey(0x2D);
    pub const KP5: EmuKey = EmuKey(0x2E);
    pub const KP6: EmuKey = EmuKey(0x2F);
    pub const COMMA: EmuKey = EmuKey(0x38);
    pub const PERIOD: EmuKey = EmuKey(0x39);
    pub const SLASH: EmuKey = EmuKey(0x3A);
    pub const KP7: EmuKey = EmuKey(0x3D);
    pub const KP8: EmuKey = EmuKey(0x3E);
    pub const KP9: EmuKey = EmuKey(0x3F);
    pub const SPACE: EmuKey = EmuKey(0x40);
    pub const BACKSPACE: EmuKey = EmuKey(0x41);
    pub const TAB: EmuKey = EmuKey(0x42);
    pub const KP_ENTER: EmuKey = EmuKey(0x43);
    pub const RETURN: EmuKey = EmuKey(0x44);
    pub const ESCAPE: EmuKey = EmuKey(0x45);
    pub const DELETE: EmuKey = EmuKey(0x46);
    pub const CURSOR_UP: EmuKey = EmuKey(0x4C);
    pub const CURSOR_DOWN: EmuKey = EmuKey(0x4D);
    pub const CURSOR_RIGHT: EmuKey = EmuKey(0x4E);
    pub const CURSOR_LEFT: EmuKey = EmuKey(0x4F);
    pub const F1: EmuKey = EmuKey(0x50);
    pub const LSHIFT: EmuKey = EmuKey(0x60);
    pub const RSHIFT: EmuKey = EmuKey(0x61);
    pub const CAPSLOCK: EmuKey = EmuKey(0x62);
    pub const CTRL: EmuKey = EmuKey(0x63);
    pub const LALT: EmuKey = EmuKey(0x64);
    pub const RALT: EmuKey = EmuKey(0x65);
    pub const LAMIGA: EmuKey = EmuKey(0x66);
    pub const RAMIGA: EmuKey = EmuKey(0x67);

    /// Letters in alphabetical order
    pub const LETTERS: [EmuKey; 26] = [
        EmuKey(0x20), // A
        EmuKey(0x35), // B
        EmuKey(0x33), // C
        EmuKey(0x22), // D
        EmuKey(0x12), // E
        EmuKey(0x23), // F
        EmuKey(0x24), // G
        EmuKey(0x25), // H
        EmuKey(0x17), // I
        EmuKey(0x26), // J
        EmuKey(0x27), // K
        EmuKey(0x28), // L
        EmuKey(0x37), // M
        EmuKey(0x36), // N
        EmuKey(0x18), // O
        EmuKey(0x19), // P
        EmuKey(0x10), // Q
        EmuKey(0x13), // R
        EmuKey(0x21), // S
        EmuKey(0x14), // T
        EmuKey(0x16), // U
        EmuKey(0x34), // V
        EmuKey(0x11), // W
        EmuKey(0x32), // X
        EmuKey(0x15), // Y
        EmuKey(0x31), // Z
    ];

    /// Letter by uppercase ASCII character
    pub fn letter(c: char) -> EmuKey {
        let offset = (c.to_ascii_uppercase() as u8).saturating_sub(b'A') as usize;
        Self::LETTERS[offset.min(25)]
    }

    /// Top-row digit; `0` sits after `9`
    pub fn digit(d: u8) -> EmuKey {
        match d {
            0 => EmuKey(0x0A),
            1..=9 => EmuKey(d),
            _ => EmuKey(0x0A),
        }
    }

    /// Function key F1..=F10
    pub fn function(n: u8) -> EmuKey {
        EmuKey(Self::F1.0 + n.clamp(1, 10) - 1)
    }

    pub fn is_letter(self) -> bool {
        Self::LETTERS.contains(&self)
    }
}

/// Host key to emulated key table
#[derive(Clone, Debug)]
pub struct KeyTranslation {
    table: HashMap<HostKey, EmuKey>,
}

impl Default for KeyTranslation {
    fn default() -> Self {
        let mut table = HashMap::new();

        for offset in 0..26u8 {
            table.insert(HostKey::letter(offset), EmuKey::LETTERS[offset as usize]);
        }
        for d in 0..10u8 {
            table.insert(HostKey::digit(d), EmuKey::digit(d));
        }
        for n in 1..=10u8 {
            table.insert(HostKey::function(n), EmuKey::function(n));
        }

        let fixed = [
            (HostKey::BACKSPACE, EmuKey::BACKSPACE),
            (HostKey::TAB, EmuKey::TAB),
            (HostKey::RETURN, EmuKey::RETURN),
            (HostKey::ESCAPE, EmuKey::ESCAPE),
            (HostKey::SPACE, EmuKey::SPACE),
            (HostKey::QUOTE, EmuKey::QUOTE),
            (HostKey::COMMA, EmuKey::COMMA),
            (HostKey::MINUS, EmuKey::MINUS),
            (HostKey::PERIOD, EmuKey::PERIOD),
            (HostKey::SLASH, EmuKey::SLASH),
            (HostKey::SEMICOLON, EmuKey::SEMICOLON),
            (HostKey::EQUALS, EmuKey::EQUALS),
            (HostKey::LEFTBRACKET, EmuKey::LEFTBRACKET),
            (HostKey::BACKSLASH, EmuKey::BACKSLASH),
            (HostKey::RIGHTBRACKET, EmuKey::RIGHTBRACKET),
            (HostKey::BACKQUOTE, EmuKey::BACKQUOTE),
            (HostKey::DELETE, EmuKey::DELETE),
            (HostKey::KP0, EmuKey::KP0),
            (HostKey::KP1, EmuKey::KP1),
            (HostKey::KP2, EmuKey::KP2),
            (HostKey::KP3, EmuKey::KP3),
            (HostKey::KP4, EmuKey::KP4),
            (HostKey::KP5, EmuKey::KP5),
            (HostKey::KP6, EmuKey::KP6),
            (HostKey::KP7, EmuKey::KP7),
            (HostKey::KP8, EmuKey::KP8),
            (HostKey::KP9, EmuKey::KP9),
            (HostKey::KP_ENTER, EmuKey::KP_ENTER),
            (HostKey::UP, EmuKey::CURSOR_UP),
            (HostKey::DOWN, EmuKey::CURSOR_DOWN),
            (HostKey::LEFT, EmuKey::CURSOR_LEFT),
            (HostKey::RIGHT, EmuKey::CURSOR_RIGHT),
            (HostKey::CAPSLOCK, EmuKey::CAPSLOCK),
            (HostKey::LSHIFT, EmuKey::LSHIFT),
            (HostKey::RSHIFT, EmuKey::RSHIFT),
            (HostKey::LCTRL, EmuKey::CTRL),
            (HostKey::RCTRL, EmuKey::CTRL),
            (HostKey::LALT, EmuKey::LALT),
            (HostKey::RALT, EmuKey::RALT),
            (HostKey::LSUPER, EmuKey::LAMIGA),
            (HostKey::RSUPER, EmuKey::RAMIGA),
        ];
        table.extend(fixed);

        Self { table }
    }
}

impl KeyTranslation {
    pub fn translate(&self, key: HostKey) -> Option<EmuKey> {
        self.table.get(&key).copied()
    }

    /// Host keys with a translation, in code order
    pub fn host_keys(&self) -> Vec<HostKey> {
        let mut keys: Vec<HostKey> = self.table.keys().copied().collect();
        keys.sort();
        keys
    }
}

/// Case lock shared by the physical and the virtual keyboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapsLock {
    active: bool,
}

impl CapsLock {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Emits the caps-lock tap and flips the lock
    pub fn tap(&mut self, out: &mut Vec<MappedEvent>) {
        out.push(MappedEvent::key(EmuKey::CAPSLOCK, true));
        out.push(MappedEvent::key(EmuKey::CAPSLOCK, false));
        self.flip();
    }

    /// Flips the lock without emitting anything
    pub fn flip(&mut self) {
        self.active = !self.active;
        info!("Caps lock {}", if self.active { "on" } else { "off" });
    }

    /// Key-down of `key`, shifted while the lock is active; returns whether shift was pressed
    pub fn press(&self, key: EmuKey, out: &mut Vec<MappedEvent>) -> bool {
        let shifted = self.active && key.is_letter();
        if shifted {
            out.push(MappedEvent::key(EmuKey::LSHIFT, true));
        }
        out.push(MappedEvent::key(key, true));
        shifted
    }

    /// Key-up matching an earlier [`CapsLock::press`]
    pub fn release(key: EmuKey, shifted: bool, out: &mut Vec<MappedEvent>) {
        out.push(MappedEvent::key(key, false));
        if shifted {
            out.push(MappedEvent::key(EmuKey::LSHIFT, false));
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum KeyLatch {
    #[default]
    Up,
    Down {
        shifted: bool,
    },
}

/// Forwards the physical keyboard to the emulated one
#[derive(Clone, Debug)]
pub struct KeyboardPassThrough {
    translation: KeyTranslation,
    keys: Vec<HostKey>,
    latches: Vec<KeyLatch>,
}

impl Default for KeyboardPassThrough {
    fn default() -> Self {
        Self::new(KeyTranslation::default())
    }
}

impl KeyboardPassThrough {
    pub fn new(translation: KeyTranslation) -> Self {
        let keys = translation.host_keys();
        Self {
            translation,
            keys,
            latches: vec![KeyLatch::Up; HOST_KEY_COUNT],
        }
    }

    pub fn translation(&self) -> &KeyTranslation {
        &self.translation
    }

    pub fn is_down(&self, key: HostKey) -> bool {
        matches!(self.latches.get(key.index()), Some(KeyLatch::Down { .. }))
    }

    /// Processes one frame of the keyboard matrix
    ///
    /// Key-downs are withheld while the overlay is visible; releases always pass.
    pub fn process(
        &mut self,
        matrix: &KeyboardMatrix,
        mode: KeyboardMode,
        overlay_visible: bool,
        keypad_joysticks: bool,
        caps: &mut CapsLock,
        out: &mut Vec<MappedEvent>,
    ) {
        if mode == KeyboardMode::SkipKeyboard {
            return;
        }

        for key in &self.keys {
            let Some(emu) = self.translation.translate(*key) else {
                continue;
            };
            let Some(latch) = self.latches.get_mut(key.index()) else {
                continue;
            };
            let held = matrix.is_held(*key);

            if emu == EmuKey::CAPSLOCK {
                match (*latch, held) {
                    (KeyLatch::Up, true) => {
                        caps.tap(out);
                        *latch = KeyLatch::Down { shifted: false };
                    }
                    (KeyLatch::Down { .. }, false) => *latch = KeyLatch::Up,
                    _ => {}
                }
                continue;
            }

            if mode == KeyboardMode::NoCursorKeys && key.is_cursor() {
                continue;
            }
            if keypad_joysticks && key.is_keypad_digit() {
                continue;
            }

            match (*latch, held) {
                (KeyLatch::Up, true) => {
                    if overlay_visible {
                        continue;
                    }
                    debug!("Key down: {:?} -> {:?}", key, emu);
                    let shifted = caps.press(emu, out);
                    *latch = KeyLatch::Down { shifted };
                }
                (KeyLatch::Down { shifted }, false) => {
                    debug!("Key up: {:?} -> {:?}", key, emu);
                    CapsLock::release(emu, shifted, out);
                    *latch = KeyLatch::Up;
                }
                _ => {}
            }
        }
    }
}

/// Keypad keys of one joystick: up, down, left, right, fire
struct KeypadLayout {
    port: usize,
    up: HostKey,
    down: HostKey,
    left: HostKey,
    right: HostKey,
    fire: HostKey,
}

const KEYPAD_LAYOUTS: [KeypadLayout; 2] = [
    KeypadLayout {
        port: 0,
        up: HostKey::KP8,
        down: HostKey::KP2,
        left: HostKey::KP4,
        right: HostKey::KP6,
        fire: HostKey::KP5,
    },
    KeypadLayout {
        port: 1,
        up: HostKey::KP9,
        down: HostKey::KP3,
        left: HostKey::KP7,
        right: HostKey::KP1,
        fire: HostKey::KP0,
    },
];

/// Resolves one joystick axis from two opposing inputs
///
/// A direction is entered only while its opposite is neither held nor
/// latched; it is left as soon as its input is released. Returns the new
/// axis value when it changed.
pub fn step_axis(
    table: &mut ControlTable,
    port: usize,
    negative: (Control, bool),
    positive: (Control, bool),
) -> Option<i8> {
    step_axis_gated(table, port, negative, positive, true)
}

/// [`step_axis`] that only lets releases through unless `allow_press`
pub fn step_axis_gated(
    table: &mut ControlTable,
    port: usize,
    negative: (Control, bool),
    positive: (Control, bool),
    allow_press: bool,
) -> Option<i8> {
    let (neg, neg_held) = negative;
    let (pos, pos_held) = positive;
    let before = axis_value(table, port, neg, pos);

    if table.is_set(port, neg.index()) && !neg_held {
        table.set(port, neg.index(), false);
    }
    if table.is_set(port, pos.index()) && !pos_held {
        table.set(port, pos.index(), false);
    }

    let latched = table.is_set(port, neg.index()) || table.is_set(port, pos.index());
    if !latched && allow_press {
        if neg_held && !pos_held {
            table.set(port, neg.index(), true);
        } else if pos_held && !neg_held {
            table.set(port, pos.index(), true);
        }
    }

    let after = axis_value(table, port, neg, pos);
    (after != before).then_some(after)
}

fn axis_value(table: &ControlTable, port: usize, neg: Control, pos: Control) -> i8 {
    if table.is_set(port, neg.index()) {
        -1
    } else if table.is_set(port, pos.index()) {
        1
    } else {
        0
    }
}

/// Keypad-driven joysticks on ports 0 and 1
#[derive(Clone, Debug, Default)]
pub struct KeypadJoysticks {
    flags: ControlTable,
}

impl KeypadJoysticks {
    pub fn flags(&self) -> &ControlTable {
        &self.flags
    }

    pub fn process(&mut self, matrix: &KeyboardMatrix, out: &mut Vec<MappedEvent>) {
        for layout in &KEYPAD_LAYOUTS {
            let port = layout.port;

            if let Some(value) = step_axis(
                &mut self.flags,
                port,
                (Control::Up, matrix.is_held(layout.up)),
                (Control::Down, matrix.is_held(layout.down)),
            ) {
                out.push(MappedEvent::JoystickAxis {
                    port,
                    axis: Axis::Vertical,
                    value,
                });
            }

            if let Some(value) = step_axis(
                &mut self.flags,
                port,
                (Control::Left, matrix.is_held(layout.left)),
                (Control::Right, matrix.is_held(layout.right)),
            ) {
                out.push(MappedEvent::JoystickAxis {
                    port,
                    axis: Axis::Horizontal,
                    value,
                });
            }

            let edge = self
                .flags
                .update(port, Control::B.index(), matrix.is_held(layout.fire));
            if edge != Edge::Unchanged {
                out.push(MappedEvent::JoystickButton {
                    port,
                    button: 0,
                    pressed: edge == Edge::Pressed,
                });
            }
        }
    }
}
