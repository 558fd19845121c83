//! Tunable constants consumed by the canvas core.
//!
//! Hosts usually keep the defaults. The struct is `Deserialize` with
//! `#[serde(default)]` so a partial settings file only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::error::CanvasError;

pub const DEFAULT_MIN_ZOOM: f32 = 0.5;
pub const DEFAULT_MAX_ZOOM: f32 = 3.0;
/// Snap tolerance in screen pixels.
pub const DEFAULT_SNAP_TOLERANCE: f32 = 5.0;
pub const DEFAULT_DIRTY_PADDING: f32 = 4.0;
pub const DEFAULT_MAX_CONTENT_LEN: usize = 100;
pub const DEFAULT_GRID_SPACING: f32 = 24.0;
pub const DEFAULT_INDEX_CELL_SIZE: f32 = 128.0;
/// Connection hover distance in screen pixels.
pub const DEFAULT_CONNECTION_HIT_DISTANCE: f32 = 6.0;
pub const DEFAULT_CURVE_MIN_OFFSET: f32 = 50.0;
pub const DEFAULT_HIT_SAMPLES: usize = 20;
/// Zoom multiplier applied per wheel step.
pub const DEFAULT_WHEEL_ZOOM_STEP: f32 = 1.1;

/// Canvas configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub snap_tolerance: f32,
    /// Scene units added around every damaged rectangle.
    pub dirty_padding: f32,
    /// Maximum number of Unicode scalar values in a node's content.
    pub max_content_len: usize,
    /// Grid spacing in scene units.
    pub grid_spacing: f32,
    /// Side length of a spatial index bucket in scene units.
    pub index_cell_size: f32,
    pub connection_hit_distance: f32,
    /// Minimum horizontal control-point offset of curved connections.
    pub curve_min_offset: f32,
    /// Segments used when measuring distance to a curved connection.
    pub hit_samples: usize,
    pub wheel_zoom_step: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            dirty_padding: DEFAULT_DIRTY_PADDING,
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
            grid_spacing: DEFAULT_GRID_SPACING,
            index_cell_size: DEFAULT_INDEX_CELL_SIZE,
            connection_hit_distance: DEFAULT_CONNECTION_HIT_DISTANCE,
            curve_min_offset: DEFAULT_CURVE_MIN_OFFSET,
            hit_samples: DEFAULT_HIT_SAMPLES,
            wheel_zoom_step: DEFAULT_WHEEL_ZOOM_STEP,
        }
    }
}

impl CanvasConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), CanvasError> {
        fn positive(name: &str, value: f32) -> Result<(), CanvasError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(CanvasError::InvalidConfig(format!("{name} must be finite and positive, got {value}")))
            }
        }

        positive("min_zoom", self.min_zoom)?;
        positive("max_zoom", self.max_zoom)?;
        if self.min_zoom > self.max_zoom {
            return Err(CanvasError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.snap_tolerance.is_finite() || self.snap_tolerance < 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "snap_tolerance must be finite and non-negative, got {}",
                self.snap_tolerance
            )));
        }
        if !self.dirty_padding.is_finite() || self.dirty_padding < 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "dirty_padding must be finite and non-negative, got {}",
                self.dirty_padding
            )));
        }
        if self.max_content_len == 0 {
            return Err(CanvasError::InvalidConfig("max_content_len must be at least 1".into()));
        }
        positive("grid_spacing", self.grid_spacing)?;
        positive("index_cell_size", self.index_cell_size)?;
        positive("connection_hit_distance", self.connection_hit_distance)?;
        if !self.curve_min_offset.is_finite() || self.curve_min_offset < 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "curve_min_offset must be finite and non-negative, got {}",
                self.curve_min_offset
            )));
        }
        if self.hit_samples == 0 {
            return Err(CanvasError::InvalidConfig("hit_samples must be at least 1".into()));
        }
        if !(self.wheel_zoom_step.is_finite() && self.wheel_zoom_step > 1.0) {
            return Err(CanvasError::InvalidConfig(format!(
                "wheel_zoom_step must be greater than 1, got {}",
                self.wheel_zoom_step
            )));
        }
        Ok(())
    }
}
