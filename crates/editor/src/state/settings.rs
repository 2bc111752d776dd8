//! Editor settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::i18n::Lang;

/// What happens when a solve is requested while variables ≠ constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolvePolicy {
    /// Never send an unbalanced sketch
    #[default]
    RequireFullyConstrained,
    /// Send only when the user explicitly forces it
    AllowOverride,
}

/// Drawing canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl CanvasSize {
    pub fn center(&self) -> [f64; 2] {
        [self.width / 2.0, self.height / 2.0]
    }
}

/// All editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Coincidence tolerance in pixels (closing, alignment snapping)
    pub halo: f64,
    /// Maximum Manhattan distance for picking points, segments and labels
    pub pick_tolerance: f64,
    pub canvas: CanvasSize,
    /// Pan distance in pixels
    pub pan_step: f64,
    /// Zoom multiplier per step
    pub zoom_factor: f64,
    /// Fraction of the canvas left empty on each side by rescale-to-fit
    pub fit_margin: f64,
    /// Display samples per curve run (Bezier) or per piece (spline, arc)
    pub curve_subdivisions: usize,
    pub solve_policy: SolvePolicy,
    /// Endpoint of the remote constraint solver
    pub solver_url: String,
    pub language: Lang,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            halo: 5.0,
            pick_tolerance: 40.0,
            canvas: CanvasSize::default(),
            pan_step: 50.0,
            zoom_factor: 1.25,
            fit_margin: 0.1,
            curve_subdivisions: 32,
            solve_policy: SolvePolicy::default(),
            solver_url: "http://127.0.0.1:3001/api/solve".to_string(),
            language: Lang::En,
        }
    }
}

impl EditorSettings {
    /// `settings.json` in the per-user config directory
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "sketch", "sketch-editor")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return default if not found
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring invalid settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to file
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            tracing::warn!("No config directory, settings not saved");
            return;
        };
        match self.save_to(&path) {
            Ok(()) => tracing::info!("Settings saved to {}", path.display()),
            Err(e) => tracing::error!("Failed to save settings to {}: {e}", path.display()),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
