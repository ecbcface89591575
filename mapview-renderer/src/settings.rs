use std::path::Path;
use std::time::Duration;

use mapview_core::EventKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed renderer settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid renderer settings: {0}")]
    Invalid(String),
}

/// Per-renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Debounce window for layers with delayed updates.
    pub delayed_update_ms: u64,
    /// Batch homogeneous vector items onto the layer canvas.
    pub use_canvas: bool,
    /// Events routed back to features by hit-testing.
    pub listens_for: Vec<EventKind>,
    /// Extra pixels around strokes and nodes that still count as a hit.
    pub hit_tolerance_px: f64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            delayed_update_ms: 500,
            use_canvas: true,
            listens_for: EventKind::ALL.to_vec(),
            hit_tolerance_px: 2.0,
        }
    }
}

impl RendererSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.hit_tolerance_px.is_finite() || self.hit_tolerance_px < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "hit_tolerance_px must be a non-negative number, got {}",
                self.hit_tolerance_px
            )));
        }
        if self.listens_for.is_empty() {
            return Err(SettingsError::Invalid(
                "listens_for must name at least one event".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delayed_update_time(&self) -> Duration {
        Duration::from_millis(self.delayed_update_ms)
    }
}
