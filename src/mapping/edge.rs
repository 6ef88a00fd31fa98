//! Edge tracking for level-sampled controls
//!
//! Every table stores the level a control had on the previous frame. An
//! update compares the new level against the stored one and writes it back,
//! so a second update with the same level in the same frame reports
//! [`Edge::Unchanged`].

use crate::controller::snapshot::{CONTROL_COUNT, MAX_PORTS};

/// Transition of a control between two samples
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
    Unchanged,
}

impl Edge {
    pub fn from_levels(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => Edge::Pressed,
            (true, false) => Edge::Released,
            _ => Edge::Unchanged,
        }
    }
}

/// Per-port, per-control "was active last frame" flags
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlTable {
    flags: [[bool; CONTROL_COUNT]; MAX_PORTS],
}

impl Default for ControlTable {
    fn default() -> Self {
        Self {
            flags: [[false; CONTROL_COUNT]; MAX_PORTS],
        }
    }
}

impl ControlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `level` and reports the transition against the previous level
    pub fn update(&mut self, port: usize, control: usize, level: bool) -> Edge {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        debug_assert!(control < CONTROL_COUNT, "control {control} out of range");

        match self.flags.get_mut(port).and_then(|p| p.get_mut(control)) {
            Some(slot) => {
                let edge = Edge::from_levels(*slot, level);
                *slot = level;
                edge
            }
            None => Edge::Unchanged,
        }
    }

    pub fn is_set(&self, port: usize, control: usize) -> bool {
        self.flags
            .get(port)
            .and_then(|p| p.get(control))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, port: usize, control: usize, level: bool) {
        debug_assert!(port < MAX_PORTS, "port {port} out of range");
        debug_assert!(control < CONTROL_COUNT, "control {control} out of range");

        if let Some(slot) = self.flags.get_mut(port).and_then(|p| p.get_mut(control)) {
            *slot = level;
        }
    }

    /// Controls of a port that are currently set, in index order
    pub fn active(&self, port: usize) -> Vec<usize> {
        self.flags
            .get(port)
            .map(|p| {
                p.iter()
                    .enumerate()
                    .filter_map(|(i, set)| set.then_some(i))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_port_empty(&self, port: usize) -> bool {
        self.flags
            .get(port)
            .map(|p| p.iter().all(|f| !f))
            .unwrap_or(true)
    }

    pub fn clear_port(&mut self, port: usize) {
        if let Some(p) = self.flags.get_mut(port) {
            *p = [false; CONTROL_COUNT];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_level_is_unchanged() {
        let mut table = ControlTable::new();
        for control in 0..CONTROL_COUNT {
            assert_eq!(table.update(1, control, true), Edge::Pressed);
            assert_eq!(table.update(1, control, true), Edge::Unchanged);
            assert_eq!(table.update(1, control, false), Edge::Released);
            assert_eq!(table.update(1, control, false), Edge::Unchanged);
        }
    }

    #[test]
    fn ports_are_independent() {
        let mut table = ControlTable::new();
        table.update(0, 3, true);
        assert!(table.is_set(0, 3));
        assert!(!table.is_set(1, 3));
        assert_eq!(table.active(0), vec![3]);
        assert!(table.is_port_empty(1));

        table.clear_port(0);
        assert!(table.is_port_empty(0));
    }

    #[test]
    fn out_of_range_reads_as_clear() {
        let table = ControlTable::new();
        assert!(!table.is_set(MAX_PORTS, 0));
        assert!(!table.is_set(0, CONTROL_COUNT));
    }
}
