//! Settings management for Air Canvas
//!
//! Preferences are stored as JSON in the platform config directory. A missing
//! or unreadable file falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "AirCanvas";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Camera index to open on the drawing screen
    pub camera_index: u32,

    /// Render loop rate (1-120, default 30)
    pub target_fps: u32,

    /// Stroke width in canvas pixels
    pub line_width: f32,

    /// Thumb-to-index vertical distance (pixels) below which the hand is pinching
    pub pinch_threshold_px: i32,

    /// Maximum number of points kept per color, oldest dropped first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Minimum landmark presence score for a hand to count as detected
    pub min_detection_confidence: f32,

    /// Whether the login screen gates the drawing screen
    pub require_login: bool,

    /// SQLite credential database
    pub database_path: PathBuf,

    /// Where saved drawings are written
    pub drawings_dir: PathBuf,

    /// Directory holding `hand_landmark.onnx`; searched for when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            target_fps: 30,
            line_width: 2.0,
            pinch_threshold_px: 30,
            history_limit: None,
            min_detection_confidence: 0.7,
            require_login: true,
            database_path: PathBuf::from("users.db"),
            drawings_dir: PathBuf::from("drawings"),
            models_dir: None,
        }
    }
}

impl Settings {
    /// Clamp values into their valid ranges
    pub fn sanitize(&mut self) {
        self.target_fps = self.target_fps.clamp(1, 120);
        self.line_width = self.line_width.clamp(1.0, 64.0);
        self.min_detection_confidence = self.min_detection_confidence.clamp(0.0, 1.0);
        if self.history_limit == Some(0) {
            self.history_limit = None;
        }
    }

    /// Get the settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_DIR_NAME);
            p.push(SETTINGS_FILE_NAME);
            p
        })
    }

    /// Load settings from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to a JSON file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from the config directory, writing the defaults there
    /// on first run
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_create(&path),
            None => {
                log::warn!("No config directory available, using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from `path`; if the file does not exist yet, save the
    /// defaults there so they can be edited
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            match settings.save_to_file(path) {
                Ok(()) => log::info!("Wrote default settings to {:?}", path),
                Err(e) => log::warn!("Failed to write default settings to {:?}: {}", path, e),
            }
            return settings;
        }

        match Self::load_from_file(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                log::warn!("Failed to load settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

/// Settings-related errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
