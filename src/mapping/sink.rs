//! Trait-Definitionen für die Ausgabe gemappter Events an das emulierte System.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::MappedEvent;

/// Trait für Event-Senken
///
/// A sink receives the events of one frame in the order the mapper produced
/// them. Delivering them to the emulated machine is up to the host.
pub trait DeviceSink: Send + 'static {
    /// Nimmt ein gemapptes Event entgegen
    fn emit(&mut self, event: &MappedEvent);

    /// Called once after every frame that produced events
    fn frame_done(&mut self) {}

    fn name(&self) -> &str;
}

/// Logs every event
#[derive(Debug, Default)]
pub struct TracingSink {
    frames: u64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceSink for TracingSink {
    fn emit(&mut self, event: &MappedEvent) {
        match event {
            MappedEvent::Command(function) => info!("Command: {:?}", function),
            MappedEvent::Overlay(command) => info!("Overlay: {:?}", command),
            other => debug!("Event: {:?}", other),
        }
    }

    fn frame_done(&mut self) {
        self.frames += 1;
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Collects events into a shared buffer
///
/// The buffer stays readable through [`RecordingSink::events`] after the
/// sink was moved into an engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<MappedEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<MappedEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl DeviceSink for RecordingSink {
    fn emit(&mut self, event: &MappedEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(e) => warn!("Recording sink poisoned: {}", e),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EmuKey;

    #[test]
    fn recording_sink_shares_its_buffer() {
        let sink = RecordingSink::new();
        let mut boxed: Box<dyn DeviceSink> = Box::new(sink.clone());

        boxed.emit(&MappedEvent::key(EmuKey::SPACE, true));
        boxed.frame_done();
        assert_eq!(sink.events(), vec![MappedEvent::key(EmuKey::SPACE, true)]);

        sink.clear();
        assert!(sink.events().is_empty());
        assert_eq!(boxed.name(), "recording");
    }
}
