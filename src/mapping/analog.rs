//! Analog stick translation
//!
//! Sticks are gated by a radial deadzone and then consumed either as
//! digital-joystick input (raw axis values plus thresholded directions) or
//! as mouse motion through a quadratic speed curve. The d-pad mouse lives
//! here too since it shares the speed modifiers.

use tracing::debug;

use crate::controller::snapshot::{Control, StickPosition, MAX_PORTS};

use super::edge::{ControlTable, Edge};

/// Full-scale divisor of the mouse speed curve
const AXIS_SCALE: f64 = 32768.0;

/// Converts a deadzone percentage into a radius in axis units
pub fn deadzone_radius(percent: u32) -> i32 {
    (percent.min(100) as i64 * 32768 / 100) as i32
}

/// Zeroes both axes when the stick rests inside the deadzone
pub fn gate(stick: StickPosition, deadzone: i32) -> StickPosition {
    if stick.magnitude() <= deadzone as f64 {
        StickPosition::CENTER
    } else {
        stick
    }
}

/// Emulated axis selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Axis values beyond the deadzone, forwarded to an analog joystick
pub fn forwarded_axes(stick: StickPosition, deadzone: i32) -> Vec<(Axis, i32)> {
    let mut axes = Vec::with_capacity(2);
    if stick.x.abs() > deadzone {
        axes.push((Axis::Horizontal, stick.x));
    }
    if stick.y.abs() > deadzone {
        axes.push((Axis::Vertical, stick.y));
    }
    axes
}

/// Updates the four direction flags of a gated stick
///
/// A direction is entered beyond the deadzone but only left once the axis
/// is back within one unit of center.
pub fn track_directions(
    table: &mut ControlTable,
    port: usize,
    stick: StickPosition,
    deadzone: i32,
) -> Vec<(Control, Edge)> {
    let rules = [
        (Control::Up, stick.y < -deadzone, stick.y > -1),
        (Control::Down, stick.y > deadzone, stick.y < 1),
        (Control::Left, stick.x < -deadzone, stick.x > -1),
        (Control::Right, stick.x > deadzone, stick.x < 1),
    ];

    let mut edges = Vec::new();
    for (control, enter, leave) in rules {
        let was = table.is_set(port, control.index());
        let level = if was { !leave } else { enter };
        let edge = table.update(port, control.index(), level);
        if edge != Edge::Unchanged {
            edges.push((control, edge));
        }
    }
    edges
}

/// Per-port mouse speed modifier bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeedModifiers(u8);

impl SpeedModifiers {
    pub const SLOWER: u8 = 1;
    pub const FASTER: u8 = 2;

    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn contains(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn slower(&self) -> bool {
        self.contains(Self::SLOWER)
    }

    pub fn faster(&self) -> bool {
        self.contains(Self::FASTER)
    }
}

/// Quadratic stick-to-mouse speed curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseCurve {
    pub speed: f32,
    pub slow_factor: f32,
    pub fast_factor: f32,
}

impl Default for MouseCurve {
    fn default() -> Self {
        Self {
            speed: 1.0,
            slow_factor: 5.0,
            fast_factor: 2.0,
        }
    }
}

impl MouseCurve {
    pub fn multiplier(&self, modifiers: SpeedModifiers) -> f64 {
        let mut multiplier = 1.0;
        if modifiers.faster() {
            multiplier *= self.fast_factor as f64;
        }
        if modifiers.slower() && self.slow_factor > 0.0 {
            multiplier /= self.slow_factor as f64;
        }
        multiplier
    }

    /// Mouse velocity for one gated axis value
    ///
    /// Never rounds to zero while the axis is outside the deadzone.
    pub fn velocity(&self, axis: i32, deadzone: i32, modifiers: SpeedModifiers) -> i32 {
        if axis == 0 {
            return 0;
        }
        let speed = self.speed as f64;
        let scaled = axis as f64 * 10.0 * (speed * speed * 0.7)
            / (AXIS_SCALE / self.multiplier(modifiers));
        let velocity = scaled as i32;
        if velocity == 0 && axis.abs() > deadzone {
            axis.signum()
        } else {
            velocity
        }
    }

    pub fn motion(
        &self,
        stick: StickPosition,
        deadzone: i32,
        modifiers: SpeedModifiers,
    ) -> (i32, i32) {
        (
            self.velocity(stick.x, deadzone, modifiers),
            self.velocity(stick.y, deadzone, modifiers),
        )
    }
}

/// Lowest and highest d-pad mouse speed
pub const DPAD_SPEED_MIN: i32 = 2;
pub const DPAD_SPEED_MAX: i32 = 14;

/// Hold time per acceleration step of the d-pad mouse
pub const DPAD_ACCEL_MS: u64 = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct DpadMouseState {
    speed: i32,
    pressed: bool,
    since: u64,
}

/// D-pad driven mouse with hold acceleration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DpadMouse {
    base_speed: i32,
    states: [DpadMouseState; MAX_PORTS],
}

/// Held d-pad directions of one port
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpadDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DpadMouse {
    pub fn new(base_speed: i32) -> Self {
        Self {
            base_speed,
            states: [DpadMouseState::default(); MAX_PORTS],
        }
    }

    /// Motion for this frame
    pub fn step(
        &mut self,
        port: usize,
        dirs: DpadDirections,
        modifiers: SpeedModifiers,
        now_ms: u64,
    ) -> (i32, i32) {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        let base_speed = self.base_speed;
        let Some(state) = self.states.get_mut(port) else {
            return (0, 0);
        };

        if !state.pressed {
            state.speed = base_speed;
        }
        if modifiers.faster() {
            state.speed += 3;
        }
        if modifiers.slower() {
            state.speed -= 4;
        }
        if state.pressed && now_ms.saturating_sub(state.since) > DPAD_ACCEL_MS {
            state.speed += 1;
            state.since = now_ms;
        }
        state.speed = state.speed.clamp(DPAD_SPEED_MIN, DPAD_SPEED_MAX);

        let mut dx = 0;
        let mut dy = 0;
        if dirs.right {
            dx += state.speed;
        } else if dirs.left {
            dx -= state.speed;
        }
        if dirs.down {
            dy += state.speed;
        } else if dirs.up {
            dy -= state.speed;
        }

        let moving = dx != 0 || dy != 0;
        if moving && !state.pressed {
            debug!("D-pad mouse started on port {}", port);
            state.pressed = true;
            state.since = now_ms;
        } else if !moving && state.pressed {
            state.pressed = false;
            state.since = 0;
        }
        (dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_gates_at_radius() {
        let dz = deadzone_radius(15);
        assert_eq!(dz, 4915);

        let at = gate(StickPosition::new(dz, 0), dz);
        assert_eq!(at, StickPosition::CENTER);
        assert!(forwarded_axes(at, dz).is_empty());

        let above = gate(StickPosition::new(-(dz + 1), 0), dz);
        assert_eq!(forwarded_axes(above, dz), vec![(Axis::Horizontal, -(dz + 1))]);

        let curve = MouseCurve::default();
        assert_eq!(curve.motion(at, dz, SpeedModifiers::default()), (0, 0));
        let (dx, dy) = curve.motion(above, dz, SpeedModifiers::default());
        assert!(dx < 0);
        assert_eq!(dy, 0);
    }

    #[test]
    fn velocity_floors_to_one() {
        let curve = MouseCurve {
            speed: 0.1,
            ..MouseCurve::default()
        };
        assert_eq!(curve.velocity(2000, 1000, SpeedModifiers::default()), 1);
        assert_eq!(curve.velocity(-2000, 1000, SpeedModifiers::default()), -1);
        // Within the deadzone nothing is forced
        assert_eq!(curve.velocity(500, 1000, SpeedModifiers::default()), 0);
    }

    #[test]
    fn speed_curve_and_modifiers() {
        let curve = MouseCurve::default();
        // 32767 * 10 * 0.7 / 32768
        assert_eq!(curve.velocity(32767, 0, SpeedModifiers::default()), 6);

        let mut fast = SpeedModifiers::default();
        fast.set(SpeedModifiers::FASTER, true);
        assert_eq!(curve.velocity(32767, 0, fast), 13);

        let mut slow = SpeedModifiers::default();
        slow.set(SpeedModifiers::SLOWER, true);
        assert_eq!(curve.velocity(32767, 0, slow), 1);

        fast.set(SpeedModifiers::FASTER, false);
        assert!(!fast.faster());
    }

    #[test]
    fn direction_hysteresis() {
        let mut table = ControlTable::new();
        let dz = 1000;

        let edges = track_directions(&mut table, 0, StickPosition::new(0, -1500), dz);
        assert_eq!(edges, vec![(Control::Up, Edge::Pressed)]);

        // Back inside the deadzone but not centered: still held
        assert!(track_directions(&mut table, 0, StickPosition::new(0, -500), dz).is_empty());
        assert!(table.is_set(0, Control::Up.index()));

        let edges = track_directions(&mut table, 0, StickPosition::new(0, 0), dz);
        assert_eq!(edges, vec![(Control::Up, Edge::Released)]);
    }

    #[test]
    fn dpad_mouse_accelerates_and_resets() {
        let mut mouse = DpadMouse::new(6);
        let right = DpadDirections {
            right: true,
            ..DpadDirections::default()
        };
        let none = SpeedModifiers::default();

        assert_eq!(mouse.step(0, right, none, 0), (6, 0));
        assert_eq!(mouse.step(0, right, none, 100), (6, 0));
        assert_eq!(mouse.step(0, right, none, 201), (7, 0));
        assert_eq!(mouse.step(0, right, none, 300), (7, 0));
        assert_eq!(mouse.step(0, right, none, 402), (8, 0));

        assert_eq!(mouse.step(0, DpadDirections::default(), none, 450), (0, 0));
        assert_eq!(mouse.step(0, right, none, 500), (6, 0));
    }

    #[test]
    fn dpad_mouse_speed_is_clamped() {
        let mut mouse = DpadMouse::new(3);
        let mut slow = SpeedModifiers::default();
        slow.set(SpeedModifiers::SLOWER, true);
        let up = DpadDirections {
            up: true,
            ..DpadDirections::default()
        };
        assert_eq!(mouse.step(1, up, slow, 0), (0, -DPAD_SPEED_MIN));

        let mut mouse = DpadMouse::new(14);
        let mut fast = SpeedModifiers::default();
        fast.set(SpeedModifiers::FASTER, true);
        assert_eq!(mouse.step(1, up, fast, 0), (0, -DPAD_SPEED_MAX));
    }
}
