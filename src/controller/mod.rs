//! Host input side of the mapper
//!
//! Everything the host reports for one frame is collected into an
//! [`InputSnapshot`](snapshot::InputSnapshot):
//!
//! 1. [`keys`] - Host key codes
//! 2. [`snapshot`] - Pads, pointer, mice and keyboard matrix for one frame
//! 3. [`source`] - Per-frame polling of host devices
//!
//! # Architecture
//!
//! ```text
//! Gamepad / Script ──► InputSource::poll ──► InputSnapshot ──► InputMapper
//! ```

pub mod keys;
pub mod snapshot;
pub mod source;

#[cfg(feature = "gilrs")]
pub mod gilrs_source;

pub use keys::HostKey;
pub use snapshot::{Control, InputSnapshot, Stick, MAX_PORTS};
pub use source::{IdleSource, InputSource, ScriptedSource, SourceError};
