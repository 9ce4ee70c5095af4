//! Pixel and optics geometry
//!
//! Pure functions shared by calibration and statistics: point distance,
//! interpolated quantiles, 35 mm equivalence and field-of-view math.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::optics::FULL_FRAME_DIAGONAL_MM;
use crate::error::{GrindError, Result};

/// Image-pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in pixels
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        distance(self, other)
    }
}

/// Euclidean distance between two points in pixels
pub fn distance(p0: &Point2D, p1: &Point2D) -> f64 {
    (p1.x - p0.x).hypot(p1.y - p0.y)
}

/// Quantile of an ascending sequence with linear interpolation between order statistics
///
/// For `idx = (n - 1) * q` the result blends `sorted[floor(idx)]` and
/// `sorted[ceil(idx)]` by the fractional part of `idx`.
///
/// # Errors
///
/// Returns `GrindError::EmptyInput` when `sorted` is empty.
pub fn quantile(sorted: &[f64], q: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(GrindError::EmptyInput {
            operation: "quantile".into(),
        });
    }

    let idx = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;

    if lo == hi {
        Ok(sorted[lo])
    } else {
        Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64))
    }
}

/// Sensor diagonal implied by an actual/35 mm-equivalent focal length pair
///
/// `equivalent = actual * (43.27 mm / diagonal)`, so
/// `diagonal = actual * 43.27 mm / equivalent`. Returns `None` when either
/// value is absent, zero, negative or not finite.
pub fn sensor_diagonal_from_focal_pair(
    actual_focal_mm: Option<f64>,
    equivalent_focal_mm: Option<f64>,
) -> Option<f64> {
    let actual = actual_focal_mm.filter(|v| v.is_finite() && *v > 0.0)?;
    let equivalent = equivalent_focal_mm.filter(|v| v.is_finite() && *v > 0.0)?;
    Some(actual * (FULL_FRAME_DIAGONAL_MM / equivalent))
}

/// Sensor aspect ratio (landscape width:height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "3:2")]
    ThreeTwo,
    #[serde(rename = "16:9")]
    SixteenNine,
}

impl AspectRatio {
    /// Parse a `"w:h"` label; anything unrecognized falls back to 4:3
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "3:2" => AspectRatio::ThreeTwo,
            "16:9" => AspectRatio::SixteenNine,
            _ => AspectRatio::FourThree,
        }
    }

    fn sides(&self) -> (f64, f64) {
        match self {
            AspectRatio::FourThree => (4.0, 3.0),
            AspectRatio::ThreeTwo => (3.0, 2.0),
            AspectRatio::SixteenNine => (16.0, 9.0),
        }
    }

    /// Ratio of sensor width to sensor diagonal: `w / sqrt(w² + h²)`
    pub fn width_factor(&self) -> f64 {
        let (w, h) = self.sides();
        w / w.hypot(h)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.sides();
        write!(f, "{}:{}", w as u32, h as u32)
    }
}

/// Horizontal field of view in radians for a sensor width and focal length
pub fn horizontal_fov(sensor_width_mm: f64, focal_mm: f64) -> f64 {
    2.0 * ((sensor_width_mm / 2.0) / focal_mm).atan()
}

/// Physical width covered by a field of view at the given subject distance
pub fn scene_width_at(distance_mm: f64, hfov_rad: f64) -> f64 {
    2.0 * distance_mm * (hfov_rad / 2.0).tan()
}
