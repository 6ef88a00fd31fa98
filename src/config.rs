//! Mapper configuration
//!
//! Stored as TOML under `~/.config/padmapper/mapper.toml`. A missing file is
//! created with defaults; every field falls back to its default when absent.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::snapshot::{Control, MAX_PORTS};
use crate::mapping::hotkey::{Binding, ControlBinding, EmuFunction, Hotkeys};
use crate::mapping::profile::{DeviceProfile, FaceLayout};
use crate::mapping::vkbd::OverlayGeometry;
use crate::mapping::MappingError;

const CONFIG_DIR: &str = ".config/padmapper";
const CONFIG_FILE: &str = "mapper.toml";

/// Which stick drives the emulated mouse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseStick {
    None,
    #[default]
    Left,
    Right,
    Both,
}

impl MouseStick {
    pub fn uses_left(self) -> bool {
        matches!(self, MouseStick::Left | MouseStick::Both)
    }

    pub fn uses_right(self) -> bool {
        matches!(self, MouseStick::Right | MouseStick::Both)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboConfig {
    pub button: Option<Control>,
    /// Full period in frames
    pub pulse: u32,
    pub enabled: bool,
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            button: Some(Control::R2),
            pulse: 6,
            enabled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogConfig {
    pub mouse_stick: MouseStick,
    /// Radial deadzone in percent of full deflection
    pub deadzone: u32,
    pub mouse_speed: f32,
    pub slow_factor: f32,
    pub fast_factor: f32,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            mouse_stick: MouseStick::Left,
            deadzone: 15,
            mouse_speed: 1.0,
            slow_factor: 5.0,
            fast_factor: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub profiles: [DeviceProfile; MAX_PORTS],
    /// Emulated port driven by each host port
    pub port_order: [usize; MAX_PORTS],
    pub retropad_layout: FaceLayout,
    pub cd32_layout: FaceLayout,
    pub turbo: TurboConfig,
    pub analog: AnalogConfig,
    pub dpad_mouse_speed: i32,
    /// Physical keyboard never yields to pad input
    pub keyboard_pass_through: bool,
    pub keypad_joysticks: bool,
    pub multi_mouse: bool,
    pub sticky_keys: bool,
    pub bindings: Vec<ControlBinding>,
    pub hotkeys: Hotkeys,
    pub vkbd: OverlayGeometry,
    pub frame_interval_ms: u64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            profiles: [
                DeviceProfile::RetroPad,
                DeviceProfile::RetroPad,
                DeviceProfile::None,
                DeviceProfile::None,
            ],
            port_order: [0, 1, 2, 3],
            retropad_layout: FaceLayout::Normal,
            cd32_layout: FaceLayout::Normal,
            turbo: TurboConfig::default(),
            analog: AnalogConfig::default(),
            dpad_mouse_speed: 4,
            keyboard_pass_through: false,
            keypad_joysticks: false,
            multi_mouse: false,
            sticky_keys: true,
            bindings: vec![
                ControlBinding {
                    control: Control::Select,
                    action: Binding::Emu(EmuFunction::ToggleVkbd),
                },
                ControlBinding {
                    control: Control::L2,
                    action: Binding::MouseLeft,
                },
            ],
            hotkeys: Hotkeys::default(),
            vkbd: OverlayGeometry::default(),
            frame_interval_ms: 20,
        }
    }
}

impl MapperConfig {
    /// Rejects values the mapper cannot run with
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.turbo.pulse == 0 {
            return Err(MappingError::ConfigError(
                "turbo pulse must be at least 1".to_string(),
            ));
        }
        if let Some(button) = self.turbo.button {
            if button.is_dpad() || button.is_analog_direction() {
                return Err(MappingError::ConfigError(format!(
                    "{:?} cannot be the turbo button",
                    button
                )));
            }
        }

        let mut order = self.port_order;
        order.sort_unstable();
        if order != [0, 1, 2, 3] {
            return Err(MappingError::ConfigError(format!(
                "port order {:?} is not a permutation of 0..{}",
                self.port_order, MAX_PORTS
            )));
        }

        if self.analog.deadzone > 100 {
            return Err(MappingError::ConfigError(format!(
                "deadzone {}% out of range",
                self.analog.deadzone
            )));
        }
        if self.vkbd.is_empty() {
            return Err(MappingError::ConfigError(
                "virtual keyboard bounds are empty".to_string(),
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(MappingError::ConfigError(
                "frame interval must be at least 1 ms".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (function, key) in self.hotkeys.entries() {
            if let Some(key) = key {
                if !seen.insert(key) {
                    return Err(MappingError::ConfigError(format!(
                        "hotkey {:?} of {:?} is already in use",
                        key, function
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, MappingError> {
        let config: MapperConfig = toml::from_str(content)
            .map_err(|e| MappingError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, MappingError> {
        toml::to_string_pretty(self)
            .map_err(|e| MappingError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn config_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Loading mapper config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&content)?;
        info!("Mapper config loaded from {}", path.display());
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = self.to_toml_string()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        debug!("Mapper config written to {}", path.display());
        Ok(())
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

/// Writes the default config unless one exists; returns its path
pub async fn ensure_default_config() -> Result<PathBuf> {
    let path = MapperConfig::config_path();
    if !tokio::fs::try_exists(&path)
        .await
        .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
    {
        info!("Creating default configuration at {}", path.display());
        MapperConfig::default().save(&path).await?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::keys::HostKey;

    #[test]
    fn default_config_is_valid_and_survives_toml() {
        let config = MapperConfig::default();
        assert!(config.validate().is_ok());

        let text = config.to_toml_string().unwrap();
        let parsed = MapperConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_document_uses_defaults() {
        let text = r#"
            profiles = ["Cd32Pad", "AnalogJoystick", "None", "Joystick"]
            sticky_keys = false

            [turbo]
            pulse = 2
            enabled = true

            [[bindings]]
            control = "L"
            action = { Key = 32 }

            [[bindings]]
            control = "RightStickUp"
            action = "MouseFaster"
        "#;
        let config = MapperConfig::from_toml_str(text).unwrap();
        assert_eq!(config.profiles[0], DeviceProfile::Cd32Pad);
        assert_eq!(config.turbo.pulse, 2);
        assert_eq!(config.turbo.button, Some(Control::R2));
        assert!(!config.sticky_keys);
        assert_eq!(config.analog.deadzone, 15);
        assert_eq!(
            config.bindings[0],
            ControlBinding {
                control: Control::L,
                action: Binding::Key(HostKey::SPACE),
            }
        );
        assert_eq!(config.bindings[1].action, Binding::MouseFaster);
    }

    #[test]
    fn validation_rejects_broken_values() {
        let mut config = MapperConfig::default();
        config.turbo.pulse = 0;
        assert!(matches!(config.validate(), Err(MappingError::ConfigError(_))));

        let mut config = MapperConfig::default();
        config.port_order = [0, 0, 2, 3];
        assert!(config.validate().is_err());

        let mut config = MapperConfig::default();
        config.vkbd.x_max = config.vkbd.x_min;
        assert!(config.validate().is_err());

        let mut config = MapperConfig::default();
        config.hotkeys.reset = config.hotkeys.toggle_vkbd;
        assert!(config.validate().is_err());

        let mut config = MapperConfig::default();
        config.turbo.button = Some(Control::Up);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn save_then_load_from_disk() {
        let mut path = std::env::temp_dir();
        path.push(format!("padmapper-test-{}", std::process::id()));
        path.push(CONFIG_FILE);

        let mut config = MapperConfig::default();
        config.keypad_joysticks = true;
        config.save(&path).await.unwrap();
        let loaded = MapperConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
