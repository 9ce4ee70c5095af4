//! Persisted calibration record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a calibration's scale factor was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationMethod {
    /// Two picked points on a ruler with a known distance
    #[default]
    TwoPoint,
    /// Estimate from focal length, sensor size and subject distance
    Optical,
}

/// Microns-per-pixel scale factor with its provenance
///
/// Immutable once created. `microns_per_pixel` always equals
/// `real_distance_mm * 1000 / pixel_distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pub id: String,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub microns_per_pixel: f64,
    pub pixel_distance: f64,
    #[serde(rename = "realDistanceMM")]
    pub real_distance_mm: f64,
    #[serde(default)]
    pub method: CalibrationMethod,
}

impl Calibration {
    pub(crate) fn create(
        name: impl Into<String>,
        notes: Option<String>,
        pixel_distance: f64,
        real_distance_mm: f64,
        method: CalibrationMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            date_created: Utc::now(),
            notes: notes.filter(|n| !n.trim().is_empty()),
            microns_per_pixel: real_distance_mm * 1000.0 / pixel_distance,
            pixel_distance,
            real_distance_mm,
            method,
        }
    }

    /// Real-world length in millimeters re-derived from the stored provenance
    pub fn derived_real_distance_mm(&self) -> f64 {
        self.pixel_distance * self.microns_per_pixel / 1000.0
    }
}
