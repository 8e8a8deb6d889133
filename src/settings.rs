use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::AudioSpec;
use crate::session::SessionConfig;

/// Digit keys can only select this many devices
const MAX_SELECTABLE_DEVICES: usize = 10;

/// Returns the path to the settings file: `~/.config/echo-rs/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("echo-rs");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    // Take
    pub max_recording_seconds: u32,

    // Requested device format
    pub sample_rate: u32,
    pub channels: u16,
    pub period_frames: u32,

    // Device selection
    pub max_devices: usize,

    // Window
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_recording_seconds: 5,

            sample_rate: 44100,
            channels: 2,
            period_frames: 4096,

            max_devices: MAX_SELECTABLE_DEVICES,

            window_width: 640.0,
            window_height: 480.0,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    ///
    /// Writes the defaults out on first run so they can be edited.
    pub fn load() -> Self {
        let path = settings_path();
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(&path);
            return settings;
        }
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Number of capture devices to offer, within what digit keys can reach
    pub fn device_limit(&self) -> usize {
        self.max_devices.clamp(1, MAX_SELECTABLE_DEVICES)
    }

    /// Format requested from both devices
    pub fn desired_spec(&self) -> AudioSpec {
        AudioSpec {
            sample_rate: self.sample_rate,
            channels: self.channels.max(1),
            bytes_per_sample: 4,
            period_frames: self.period_frames,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            desired: self.desired_spec(),
            max_seconds: self.max_recording_seconds.max(1),
        }
    }
}
