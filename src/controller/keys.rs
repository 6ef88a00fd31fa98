//! Host key codes
//!
//! Host keys use the libretro keyboard numbering so that frontends can hand
//! their matrix over without translation.

use serde::{Deserialize, Serialize};

/// One past the highest recognised host key code
pub const HOST_KEY_COUNT: usize = 323;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostKey(pub u16);

impl HostKey {
    pub const BACKSPACE: HostKey = HostKey(8);
    pub const TAB: HostKey = HostKey(9);
    pub const RETURN: HostKey = HostKey(13);
    pub const ESCAPE: HostKey = HostKey(27);
    pub const SPACE: HostKey = HostKey(32);
    pub const QUOTE: HostKey = HostKey(39);
    pub const COMMA: HostKey = HostKey(44);
    pub const MINUS: HostKey = HostKey(45);
    pub const PERIOD: HostKey = HostKey(46);
    pub const SLASH: HostKey = HostKey(47);
    pub const NUM_0: HostKey = HostKey(48);
    pub const SEMICOLON: HostKey = HostKey(59);
    pub const EQUALS: HostKey = HostKey(61);
    pub const LEFTBRACKET: HostKey = HostKey(91);
    pub const BACKSLASH: HostKey = HostKey(92);
    pub const RIGHTBRACKET: HostKey = HostKey(93);
    pub const BACKQUOTE: HostKey = HostKey(96);
    pub const A: HostKey = HostKey(97);
    pub const DELETE: HostKey = HostKey(127);
    pub const KP0: HostKey = HostKey(256);
    pub const KP1: HostKey = HostKey(257);
    pub const KP2: HostKey = HostKey(258);
    pub const KP3: HostKey = HostKey(259);
    pub const KP4: HostKey = HostKey(260);
    pub const KP5: HostKey = HostKey(261);
    pub const KP6: HostKey = HostKey(262);
    pub const KP7: HostKey = HostKey(263);
    pub const KP8: HostKey = HostKey(264);
    pub const KP9: HostKey = HostKey(265);
    pub const KP_ENTER: HostKey = HostKey(271);
    pub const UP: HostKey = HostKey(273);
    pub const DOWN: HostKey = HostKey(274);
    pub const RIGHT: HostKey = HostKey(275);
    pub const LEFT: HostKey = HostKey(276);
    pub const F1: HostKey = HostKey(282);
    pub const F11: HostKey = HostKey(292);
    pub const F12: HostKey = HostKey(293);
    pub const CAPSLOCK: HostKey = HostKey(301);
    pub const RSHIFT: HostKey = HostKey(303);
    pub const LSHIFT: HostKey = HostKey(304);
    pub const RCTRL: HostKey = HostKey(305);
    pub const LCTRL: HostKey = HostKey(306);
    pub const RALT: HostKey = HostKey(307);
    pub const LALT: HostKey = HostKey(308);
    pub const LSUPER: HostKey = HostKey(311);
    pub const RSUPER: HostKey = HostKey(312);

    /// The four cursor keys
    pub const CURSOR: [HostKey; 4] = [HostKey::UP, HostKey::DOWN, HostKey::LEFT, HostKey::RIGHT];

    /// Keypad digits 0..=9
    pub const KEYPAD_DIGITS: [HostKey; 10] = [
        HostKey::KP0,
        HostKey::KP1,
        HostKey::KP2,
        HostKey::KP3,
        HostKey::KP4,
        HostKey::KP5,
        HostKey::KP6,
        HostKey::KP7,
        HostKey::KP8,
        HostKey::KP9,
    ];

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Letter key `a`..=`z` by offset
    pub const fn letter(offset: u8) -> HostKey {
        HostKey(Self::A.0 + offset as u16)
    }

    /// Top-row digit `0`..=`9`
    pub const fn digit(d: u8) -> HostKey {
        HostKey(Self::NUM_0.0 + d as u16)
    }

    /// Function key F1..=F12
    pub const fn function(n: u8) -> HostKey {
        HostKey(Self::F1.0 + n as u16 - 1)
    }

    pub fn is_cursor(self) -> bool {
        Self::CURSOR.contains(&self)
    }

    pub fn is_keypad_digit(self) -> bool {
        Self::KEYPAD_DIGITS.contains(&self)
    }
}
