use std::path::PathBuf;

use color_eyre::{eyre::eyre, Result};
use padmapper::config::{ensure_default_config, MapperConfig};
use padmapper::controller::InputSource;
use padmapper::mapping::{MappingEngineHandle, TracingSink};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Konfiguration laden, optional aus dem ersten Argument
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => ensure_default_config().await?,
    };
    let config = MapperConfig::load(&path).await?;
    info!(
        "Ports: {:?}, frame interval {}ms",
        config.profiles, config.frame_interval_ms
    );

    let source = open_source()?;
    info!("Using input source: {}", source.name());

    let mut handle = MappingEngineHandle::new("padmapper".to_string());
    handle
        .start(&config, source, Box::new(TracingSink::new()))
        .map_err(|e| eyre!("Failed to start mapping engine: {}", e))?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to wait for Ctrl-C: {}", e))?;
    info!("Ctrl-C received, shutting down");

    handle.shutdown().await?;
    Ok(())
}

#[cfg(feature = "gilrs")]
fn open_source() -> Result<Box<dyn InputSource + Send>> {
    use padmapper::controller::gilrs_source::GilrsSource;

    let source = GilrsSource::create()
        .map_err(|e| eyre!("Failed to open gamepads: {}", e))?
        .initialize();
    Ok(Box::new(source))
}

#[cfg(not(feature = "gilrs"))]
fn open_source() -> Result<Box<dyn InputSource + Send>> {
    use padmapper::controller::IdleSource;

    tracing::warn!("Built without gamepad support, no input will be mapped");
    Ok(Box::new(IdleSource))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
