//! Per-port status readout for the on-screen status bar
//!
//! A read-only projection of the joystick, mouse, analog and keypad flag
//! tables. Rendering is left to the host.

use std::fmt;

use crate::controller::snapshot::{Control, MAX_PORTS};

use super::edge::ControlTable;
use super::profile::{DeviceProfile, ProfileMapper};

pub const GLYPH_UP: char = '↑';
pub const GLYPH_DOWN: char = '↓';
pub const GLYPH_LEFT: char = '←';
pub const GLYPH_RIGHT: char = '→';

/// One cell of a readout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indicator {
    pub symbol: char,
    pub highlighted: bool,
}

impl Default for Indicator {
    fn default() -> Self {
        Self {
            symbol: ' ',
            highlighted: false,
        }
    }
}

impl Indicator {
    fn show(&mut self, symbol: char) {
        self.symbol = symbol;
        self.highlighted = true;
    }

    fn highlight(&mut self) {
        self.highlighted = true;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortReadout {
    pub port: usize,
    /// J, M, A or K followed by the port number
    pub label: String,
    /// Left, center and right cell
    pub cells: [Indicator; 3],
}

impl fmt::Display for PortReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        for cell in &self.cells {
            write!(f, "{}", cell.symbol)?;
        }
        Ok(())
    }
}

/// Which glyph set a readout uses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphSet {
    Generic,
    RetroPad { rotated: bool },
    Cd32,
    Mouse,
    Analog,
}

/// Renders one flag row into three cells
pub fn cells(flags: &ControlTable, port: usize, glyphs: GlyphSet, alt_jump: bool) -> [Indicator; 3] {
    let set = |c: Control| flags.is_set(port, c.index());
    let mut cells = [Indicator::default(); 3];
    let [left, center, right] = &mut cells;

    if set(Control::Up) || alt_jump {
        center.show(GLYPH_UP);
    } else if set(Control::Down) {
        center.show(GLYPH_DOWN);
    }
    if set(Control::Left) {
        left.show(GLYPH_LEFT);
    } else if set(Control::Right) {
        right.show(GLYPH_RIGHT);
    }

    // Later buttons override earlier ones in the center cell
    let buttons = [Control::B, Control::A, Control::Y, Control::X];
    for button in buttons.into_iter().filter(|b| set(*b)) {
        let glyph = match (glyphs, button) {
            (GlyphSet::RetroPad { rotated: false }, Control::B) => Some('1'),
            (GlyphSet::RetroPad { rotated: false }, Control::A) => Some('2'),
            (GlyphSet::RetroPad { rotated: false }, Control::Y) => Some('Y'),
            (GlyphSet::RetroPad { rotated: true }, Control::B) => Some('2'),
            (GlyphSet::RetroPad { rotated: true }, Control::A) => Some('A'),
            (GlyphSet::RetroPad { rotated: true }, Control::Y) => Some('1'),
            (GlyphSet::RetroPad { .. }, _) => Some('X'),
            (GlyphSet::Mouse, Control::B) => Some('L'),
            (GlyphSet::Mouse, Control::A) => Some('R'),
            (GlyphSet::Mouse, Control::Y) => Some('M'),
            (GlyphSet::Mouse, _) => None,
            (GlyphSet::Analog, Control::B) => Some('1'),
            (GlyphSet::Analog, Control::A) => Some('2'),
            (GlyphSet::Analog, Control::Y) => Some('3'),
            (GlyphSet::Analog, _) => Some('4'),
            (GlyphSet::Generic | GlyphSet::Cd32, _) => None,
        };
        match glyph {
            Some(symbol) => center.show(symbol),
            None if glyphs != GlyphSet::Mouse => center.highlight(),
            None => {}
        }
    }

    if glyphs == GlyphSet::Cd32 {
        if set(Control::Start) {
            center.highlight();
        }
        if set(Control::L) {
            left.highlight();
        }
        if set(Control::R) {
            right.highlight();
        }
    }
    cells
}

/// Everything the readout is projected from
pub struct StatusTables<'a> {
    pub profiles: &'a ProfileMapper,
    /// Joystick flags by emulated port
    pub joystick: &'a ControlTable,
    pub alt_jump: [bool; MAX_PORTS],
    pub mouse: &'a ControlTable,
    pub analog: &'a ControlTable,
    pub keypad: &'a ControlTable,
    pub mouse_mode: bool,
    pub keypad_enabled: bool,
}

impl StatusTables<'_> {
    /// Readouts for ports 0 and 1, plus 2 and 3 when assigned
    pub fn readouts(&self) -> Vec<PortReadout> {
        (0..MAX_PORTS)
            .filter_map(|port| self.readout(port))
            .collect()
    }

    pub fn readout(&self, port: usize) -> Option<PortReadout> {
        let profile = self.profiles.profile(port);
        let number = port + 1;

        if port >= 2 {
            if profile == DeviceProfile::None {
                return None;
            }
            return Some(PortReadout {
                port,
                label: format!("J{number}"),
                cells: cells(
                    self.joystick,
                    port,
                    GlyphSet::Generic,
                    self.alt_jump.get(port).copied().unwrap_or(false),
                ),
            });
        }

        // Precedence: keypad, analog, mouse, joystick
        if self.keypad_enabled && !self.keypad.is_port_empty(port) {
            return Some(PortReadout {
                port,
                label: format!("K{number}"),
                cells: cells(self.keypad, port, GlyphSet::Generic, false),
            });
        }
        if profile == DeviceProfile::AnalogJoystick && !self.analog.is_port_empty(port) {
            return Some(PortReadout {
                port,
                label: format!("A{number}"),
                cells: cells(self.analog, port, GlyphSet::Analog, false),
            });
        }
        if !self.mouse.is_port_empty(port) {
            return Some(PortReadout {
                port,
                label: format!("M{number}"),
                cells: cells(self.mouse, port, GlyphSet::Mouse, false),
            });
        }

        let glyphs = match profile {
            _ if self.mouse_mode => GlyphSet::Mouse,
            DeviceProfile::RetroPad => GlyphSet::RetroPad {
                rotated: self.profiles.layout(port).is_rotated(),
            },
            DeviceProfile::Cd32Pad => GlyphSet::Cd32,
            DeviceProfile::AnalogJoystick => GlyphSet::Analog,
            _ => GlyphSet::Generic,
        };
        let prefix = if self.mouse_mode { 'M' } else { 'J' };
        Some(PortReadout {
            port,
            label: format!("{prefix}{number}"),
            cells: cells(self.joystick, port, glyphs, self.alt_jump.get(port).copied().unwrap_or(false)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::profile::FaceLayout;

    fn profiles(layout: FaceLayout) -> ProfileMapper {
        ProfileMapper::new(
            [
                DeviceProfile::RetroPad,
                DeviceProfile::Cd32Pad,
                DeviceProfile::None,
                DeviceProfile::Joystick,
            ],
            layout,
            FaceLayout::Normal,
        )
    }

    #[test]
    fn retropad_glyphs() {
        let mut table = ControlTable::new();
        table.set(0, Control::Left.index(), true);
        table.set(0, Control::B.index(), true);
        let c = cells(&table, 0, GlyphSet::RetroPad { rotated: false }, false);
        assert_eq!(c[0].symbol, GLYPH_LEFT);
        assert_eq!(c[1].symbol, '1');
        assert!(c[1].highlighted);
        assert!(!c[2].highlighted);

        let c = cells(&table, 0, GlyphSet::RetroPad { rotated: true }, false);
        assert_eq!(c[1].symbol, '2');
    }

    #[test]
    fn cd32_highlights_shoulders() {
        let mut table = ControlTable::new();
        table.set(1, Control::Up.index(), true);
        table.set(1, Control::R.index(), true);
        table.set(1, Control::B.index(), true);
        let c = cells(&table, 1, GlyphSet::Cd32, false);
        assert_eq!(c[1].symbol, GLYPH_UP);
        assert!(c[1].highlighted);
        assert!(c[2].highlighted);
        assert_eq!(c[2].symbol, ' ');
        assert!(!c[0].highlighted);
    }

    #[test]
    fn readout_labels_and_precedence() {
        let profiles = profiles(FaceLayout::Normal);
        let joystick = ControlTable::new();
        let mut mouse = ControlTable::new();
        let analog = ControlTable::new();
        let keypad = ControlTable::new();

        let tables = StatusTables {
            profiles: &profiles,
            joystick: &joystick,
            alt_jump: [true, false, false, false],
            mouse: &mouse,
            analog: &analog,
            keypad: &keypad,
            mouse_mode: false,
            keypad_enabled: false,
        };
        let readouts = tables.readouts();
        let labels: Vec<&str> = readouts.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["J1", "J2", "J4"]);
        assert_eq!(readouts[0].to_string(), "J1 ↑ ");

        mouse.set(1, Control::A.index(), true);
        let tables = StatusTables {
            profiles: &profiles,
            joystick: &joystick,
            alt_jump: [false; MAX_PORTS],
            mouse: &mouse,
            analog: &analog,
            keypad: &keypad,
            mouse_mode: true,
            keypad_enabled: false,
        };
        assert_eq!(tables.readout(0).map(|r| r.label), Some("M1".to_string()));
        let second = tables.readout(1);
        assert_eq!(second.as_ref().map(|r| r.to_string()), Some("M2 R ".to_string()));
    }
}
