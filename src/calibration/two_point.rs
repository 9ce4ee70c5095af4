//! Two-point ruler calibration
//!
//! The operator picks two marks on a ruler photographed in the same plane as
//! the grounds and types the real distance between them. This is the
//! authoritative method whenever a ruler is available.

use log::info;

use crate::calibration::record::{Calibration, CalibrationMethod};
use crate::error::{GrindError, Result};
use crate::geometry::{distance, Point2D};

/// Scale factor computed from two picked points and a known distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPointCalibration {
    pub p0: Point2D,
    pub p1: Point2D,
    pub pixel_distance: f64,
    pub real_distance_mm: f64,
    pub microns_per_pixel: f64,
}

impl TwoPointCalibration {
    /// Compute the scale from picked points
    ///
    /// Only the first two points are used, matching a picker that restarts
    /// after the second click.
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidCalibrationInput` if:
    /// - fewer than two points are supplied
    /// - `real_distance_mm` is not a positive finite number
    /// - the two points coincide
    pub fn from_points(points: &[Point2D], real_distance_mm: f64) -> Result<Self> {
        let (p0, p1) = match points {
            [p0, p1, ..] => (*p0, *p1),
            _ => {
                return Err(GrindError::invalid_calibration(format!(
                    "two points are required, got {}",
                    points.len()
                )))
            }
        };

        Self::new(p0, p1, real_distance_mm)
    }

    /// Compute the scale from an explicit pair of points
    pub fn new(p0: Point2D, p1: Point2D, real_distance_mm: f64) -> Result<Self> {
        if !real_distance_mm.is_finite() || real_distance_mm <= 0.0 {
            return Err(GrindError::invalid_calibration(format!(
                "real distance must be positive, got {real_distance_mm} mm"
            )));
        }

        let pixel_distance = distance(&p0, &p1);
        if !pixel_distance.is_finite() || pixel_distance == 0.0 {
            return Err(GrindError::invalid_calibration(
                "the two points are at the same position",
            ));
        }

        Ok(Self {
            p0,
            p1,
            pixel_distance,
            real_distance_mm,
            microns_per_pixel: real_distance_mm * 1000.0 / pixel_distance,
        })
    }

    /// Wrap the result into a persisted calibration record
    pub fn into_calibration(self, name: impl Into<String>, notes: Option<String>) -> Calibration {
        let calibration = Calibration::create(
            name,
            notes,
            self.pixel_distance,
            self.real_distance_mm,
            CalibrationMethod::TwoPoint,
        );
        info!(
            "Created two-point calibration '{}' ({:.3} µm/px over {:.1} px)",
            calibration.name, calibration.microns_per_pixel, calibration.pixel_distance
        );
        calibration
    }
}
