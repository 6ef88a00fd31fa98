//! Host input sources
//!
//! A source is polled once per frame and returns a complete
//! [`InputSnapshot`]. Sources never block; a source without fresh data
//! returns its last known state.

use std::collections::VecDeque;

use tracing::{debug, info};

use super::snapshot::InputSnapshot;

/// Errors raised while opening a host input source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize input source: {0}")]
    InitializationError(String),
}

/// Supplier of one snapshot per frame
pub trait InputSource {
    /// Samples the host devices for the current frame
    fn poll(&mut self) -> InputSnapshot;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Source that never reports any input
#[derive(Debug, Default)]
pub struct IdleSource;

impl InputSource for IdleSource {
    fn poll(&mut self) -> InputSnapshot {
        InputSnapshot::default()
    }

    fn name(&self) -> &str {
        "idle"
    }
}

/// Replays a fixed sequence of snapshots, then keeps repeating the last one
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<InputSnapshot>,
    last: InputSnapshot,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = InputSnapshot>) -> Self {
        let frames: VecDeque<InputSnapshot> = frames.into_iter().collect();
        info!("Created scripted input source with {} frames", frames.len());
        Self {
            frames,
            last: InputSnapshot::default(),
        }
    }

    pub fn push(&mut self, frame: InputSnapshot) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedSource {
    fn poll(&mut self) -> InputSnapshot {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        } else {
            debug!("Script exhausted, repeating last frame");
        }
        self.last.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::snapshot::Control;

    #[test]
    fn scripted_source_repeats_last_frame() {
        let pressed = InputSnapshot::default().with_button(0, Control::B);
        let mut source = ScriptedSource::new([InputSnapshot::default(), pressed.clone()]);

        assert_eq!(source.poll(), InputSnapshot::default());
        assert_eq!(source.poll(), pressed);
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.poll(), pressed);
    }

    #[test]
    fn idle_source_is_empty() {
        let mut source = IdleSource;
        assert_eq!(source.poll(), InputSnapshot::default());
    }
}
