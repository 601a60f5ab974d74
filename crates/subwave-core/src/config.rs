//! Timeline configuration
//!
//! Persisted, bounded settings injected into the timeline engine as a
//! read-only object. Loading falls back to defaults on a missing or invalid
//! file; every numeric field is clamped to its documented bounds after load
//! so a hand-edited file can never put the engine out of range.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Which reference points a multi-entry move snaps with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DragReference {
    /// Per-track min-start/max-end across the selection.
    #[default]
    EachTrackOfWhole,
    /// The selection's overall [min-start, max-end].
    Whole,
    /// Only the entry under the pointer.
    One,
}

/// Bounded timeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Track label and entry text size in px. Minimum 5.
    pub font_size: f32,
    /// Waveform resolution in intensity points per second. 50 to 800.
    pub waveform_resolution: u32,
    /// Size of the resize hit area at entry edges, in px. 1 to 10.
    pub drag_resize_area: f32,
    /// Size of the seam hit area at shared boundaries, in px. 1 to 10.
    pub drag_seam_area: f32,
    /// Snap threshold in px. 1 to 10.
    pub snap_distance: f32,
    pub multiselect_drag_reference: DragReference,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            waveform_resolution: 700,
            drag_resize_area: 5.0,
            drag_seam_area: 5.0,
            snap_distance: 5.0,
            multiselect_drag_reference: DragReference::default(),
        }
    }
}

impl TimelineConfig {
    /// Clamp every field to its documented bounds.
    pub fn clamp(mut self) -> Self {
        self.font_size = self.font_size.max(5.0);
        self.waveform_resolution = self.waveform_resolution.clamp(50, 800);
        self.drag_resize_area = self.drag_resize_area.clamp(1.0, 10.0);
        self.drag_seam_area = self.drag_seam_area.clamp(1.0, 10.0);
        self.snap_distance = self.snap_distance.clamp(1.0, 10.0);
        self
    }
}

/// Default location of the timeline config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("subwave")
        .join("timeline.yaml")
}

/// Load configuration from a YAML file.
///
/// Returns defaults when the file is missing or invalid.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("load_config: failed to parse {:?}: {}, using defaults", path, e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: failed to read {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {:?}", parent))?;
    }
    let contents = serde_yaml::to_string(config).context("serializing config")?;
    std::fs::write(path, contents).with_context(|| format!("writing config to {:?}", path))?;
    Ok(())
}
