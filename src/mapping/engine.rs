//! Mapping engine with statum state machine for the frame loop
//!
//! Owns one [`InputMapper`] and drives it at a fixed frame rate on its own
//! tokio task. Every frame the input source is polled once, the snapshot is
//! translated and the resulting events are handed to the sink.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//!                                   │              ▲
//!                                   └──────────────┘
//!                                      (shutdown)
//! ```
//!
//! # Architecture
//!
//! ```text
//! InputSource ──► InputSnapshot ──► [InputMapper] ──► MappedEvent ──► DeviceSink
//!                                         ▲
//!                                    frame clock
//! ```

use std::time::Duration;

use statum::{machine, state};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MapperConfig;
use crate::controller::InputSource;
use crate::mapping::{DeviceSink, EmuFunction, InputMapper, MappedEvent, MappingError};

/// States for mapping engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum MappingEngineState {
    Initializing, // Source and sink attached
    Configured,   // Mapper built from a validated config
    Active,       // Running the frame loop
    Deactivating, // Releasing held outputs
    Deactivated,  // Fully stopped
}

/// Mapping engine with compile-time state safety via statum
#[machine]
pub struct MappingEngine<S: MappingEngineState> {
    source: Box<dyn InputSource + Send>,
    sink: Box<dyn DeviceSink>,
    name: String,
    mapper: Option<InputMapper>,
    frame_interval: Duration,
    frames: u64,
}

impl<S: MappingEngineState> MappingEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl MappingEngine<Initializing> {
    pub fn create(
        source: Box<dyn InputSource + Send>,
        sink: Box<dyn DeviceSink>,
        name: String,
    ) -> Self {
        info!(
            "Initializing new mapping engine: {} ({} -> {})",
            name,
            source.name(),
            sink.name()
        );

        Self::new(
            source,
            sink,
            name,
            None,                      // mapper
            Duration::from_millis(20), // frame_interval
            0,                         // frames
        )
    }

    /// Validates the config, builds the mapper and transitions to Configured
    pub fn configure(
        mut self,
        config: &MapperConfig,
    ) -> Result<MappingEngine<Configured>, MappingError> {
        info!("Configuring mapping engine: {}", self.name);

        if let Err(e) = config.validate() {
            error!("Rejected mapper config: {}", e);
            return Err(e);
        }

        self.mapper = Some(InputMapper::new(config));
        self.frame_interval = Duration::from_millis(config.frame_interval_ms);
        debug!("Frame interval {}ms", config.frame_interval_ms);

        info!("Engine configured successfully: {}", self.name);
        Ok(self.transition())
    }
}

impl MappingEngine<Configured> {
    pub fn activate(self) -> MappingEngine<Active> {
        info!("Activating mapping engine: {}", self.name);
        self.transition()
    }
}

impl MappingEngine<Active> {
    /// Polls the source once and translates the snapshot
    pub fn process_frame(&mut self, now_ms: u64) -> Result<Vec<MappedEvent>, MappingError> {
        let mapper = match &mut self.mapper {
            Some(m) => m,
            None => {
                return Err(MappingError::InitializationError(
                    "No mapper available".to_string(),
                ))
            }
        };

        let snapshot = self.source.poll();
        self.frames += 1;
        Ok(mapper.process_frame(&snapshot, now_ms))
    }

    fn deliver(&mut self, events: &[MappedEvent]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            self.sink.emit(event);
        }
        self.sink.frame_done();
    }

    /// Main frame loop with graceful shutdown support
    ///
    /// Runs one frame per interval until the shutdown signal arrives. Late
    /// ticks are skipped rather than replayed.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<MappingEngine<Deactivating>, MappingError> {
        info!("Starting frame loop for: {}", self.name);

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                _ = ticker.tick() => {
                    let now_ms = started.elapsed().as_millis() as u64;
                    match self.process_frame(now_ms) {
                        Ok(events) => self.deliver(&events),
                        Err(e) => {
                            error!("Error processing frame: {}", e);
                        }
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        Ok(self.transition())
    }

    pub fn deactivate(self) -> MappingEngine<Deactivating> {
        info!("Deactivating mapping engine: {}", self.name);
        self.transition()
    }
}

impl MappingEngine<Deactivating> {
    /// Hides the overlay so that its held keys are released, then stops
    pub async fn shutdown(mut self) -> MappingEngine<Deactivated> {
        info!("Shutting down mapping engine: {}", self.name);

        if let Some(mapper) = &mut self.mapper {
            if mapper.is_overlay_visible() {
                debug!("Closing virtual keyboard");
                let mut events = Vec::new();
                mapper.apply_function(EmuFunction::ToggleVkbd, &mut events);
                for event in &events {
                    self.sink.emit(event);
                }
                self.sink.frame_done();
            }
        }

        info!(
            "Engine shut down successfully: {} after {} frames",
            self.name, self.frames
        );
        self.transition()
    }
}

// Implementierung für den deaktivierten Zustand
impl MappingEngine<Deactivated> {}

/// Handle for managing a mapping engine in a tokio task
#[derive(Debug)]
pub struct MappingEngineHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), MappingError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MappingEngineHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Starts the engine in a tokio task
    ///
    /// Creates the engine, configures it, activates it and spawns the frame
    /// loop in a background task.
    pub fn start(
        &mut self,
        config: &MapperConfig,
        source: Box<dyn InputSource + Send>,
        sink: Box<dyn DeviceSink>,
    ) -> Result<(), MappingError> {
        if self.task_handle.is_some() {
            return Err(MappingError::InitializationError(format!(
                "Engine {} is already running",
                self.name
            )));
        }

        let engine_name = self.name.clone();
        let engine = MappingEngine::create(source, sink, engine_name.clone()).configure(config)?;
        let active_engine = engine.activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    info!("Engine entering deactivating state: {}", engine_name);
                    let _ = deactivating_engine.shutdown().await;
                    Ok(())
                }
                Err(e) => {
                    error!("Error running engine: {} - {}", engine_name, e);
                    Err(e)
                }
            }
        });

        self.task_handle = Some(task_handle);
        info!("Mapping engine activated: {}", self.name);
        Ok(())
    }

    /// Gracefully shuts down engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), MappingError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(MappingError::ThreadError(format!(
                        "Engine task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}
