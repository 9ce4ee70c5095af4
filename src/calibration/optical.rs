//! Optical scale estimation from EXIF or phone lens data
//!
//! Derives the physical width of the photographed scene from the sensor
//! width, focal length and subject distance, then divides by the image width
//! in pixels. Missing inputs are replaced by lens-table values or typical
//! defaults; every substitution is reported as a warning so callers can flag
//! the result as lower confidence than a two-point calibration.
//!
//! Pipeline:
//! 1. focal length: EXIF `FocalLength`, then selected lens, then 5.5 mm
//! 2. 35 mm equivalent: EXIF `FocalLengthIn35mmFilm`, then selected lens
//! 3. subject distance: EXIF `SubjectDistance`, then operator value, then 200 mm
//! 4. sensor diagonal from the focal pair, else 9.0 mm
//! 5. sensor width from the diagonal and aspect ratio
//! 6. horizontal field of view
//! 7. scene width at the subject distance
//! 8. microns per pixel

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::calibration::lenses::{PhoneLensSpec, PhoneModelSpec};
use crate::calibration::record::{Calibration, CalibrationMethod};
use crate::constants::optics::{
    DEFAULT_SUBJECT_DISTANCE_MM, FALLBACK_FOCAL_LENGTH_MM, FALLBACK_SENSOR_DIAGONAL_MM,
};
use crate::error::{GrindError, Result};
use crate::exif::{ExifExtractor, ImageMetadata};
use crate::geometry::{horizontal_fov, scene_width_at, sensor_diagonal_from_focal_pair, AspectRatio};
use crate::image_loader;

/// Phone and lens picked by the operator as a fallback for missing EXIF
#[derive(Debug, Clone, Copy)]
pub struct LensSelection<'a> {
    pub phone: &'a PhoneModelSpec,
    pub lens: &'a PhoneLensSpec,
}

/// Everything the optical estimate is computed from
#[derive(Debug, Clone, Default)]
pub struct OpticalInput<'a> {
    /// Width of the captured image in pixels
    pub image_width_px: u32,
    /// Metadata read from the image, possibly empty
    pub metadata: ImageMetadata,
    /// Camera-to-subject distance typed by the operator, in centimeters
    pub operator_distance_cm: Option<f64>,
    /// Lens table fallback
    pub selection: Option<LensSelection<'a>>,
}

/// Best-effort optical scale estimate with the assumptions it relied on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCalibrationResult {
    pub model: Option<String>,
    pub lens: Option<String>,
    #[serde(rename = "focalLengthMM")]
    pub focal_length_mm: f64,
    #[serde(rename = "equivalent35mmFocalLengthMM")]
    pub equivalent_35mm_focal_length_mm: Option<f64>,
    #[serde(rename = "sensorDiagonalMM")]
    pub sensor_diagonal_mm: f64,
    #[serde(rename = "sensorWidthMM")]
    pub sensor_width_mm: f64,
    #[serde(rename = "subjectDistanceMM")]
    pub subject_distance_mm: f64,
    #[serde(rename = "sceneWidthMM")]
    pub scene_width_mm: f64,
    pub aspect_ratio: AspectRatio,
    pub image_width_px: u32,
    pub microns_per_pixel: f64,
    pub warnings: Vec<String>,
}

impl AutoCalibrationResult {
    /// True when at least one input was substituted by a fallback
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Wrap the estimate into a persisted calibration record
    ///
    /// The image width stands in for the pixel distance and the scene width
    /// for the real distance, so the record keeps the usual
    /// `microns_per_pixel = real * 1000 / pixels` relation.
    pub fn to_calibration(&self, name: impl Into<String>, notes: Option<String>) -> Calibration {
        let calibration = Calibration::create(
            name,
            notes,
            f64::from(self.image_width_px),
            self.scene_width_mm,
            CalibrationMethod::Optical,
        );
        info!(
            "Created optical calibration '{}' ({:.3} µm/px, {} warning(s))",
            calibration.name,
            calibration.microns_per_pixel,
            self.warnings.len()
        );
        calibration
    }
}

/// Optical estimator with tunable fallback values
pub struct OpticalEstimator {
    fallback_focal_mm: f64,
    fallback_sensor_diagonal_mm: f64,
    default_distance_mm: f64,
}

impl Default for OpticalEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpticalEstimator {
    /// Create an estimator with the typical phone fallbacks
    pub fn new() -> Self {
        Self {
            fallback_focal_mm: FALLBACK_FOCAL_LENGTH_MM,
            fallback_sensor_diagonal_mm: FALLBACK_SENSOR_DIAGONAL_MM,
            default_distance_mm: DEFAULT_SUBJECT_DISTANCE_MM,
        }
    }

    /// Create an estimator with custom fallbacks
    pub fn with_params(
        fallback_focal_mm: f64,
        fallback_sensor_diagonal_mm: f64,
        default_distance_mm: f64,
    ) -> Self {
        Self {
            fallback_focal_mm,
            fallback_sensor_diagonal_mm,
            default_distance_mm,
        }
    }

    /// Estimate microns per pixel
    ///
    /// Missing metadata never fails the estimate; it adds warnings instead.
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidCalibrationInput` if:
    /// - the image width is zero
    /// - the operator distance is given but not a positive finite number
    pub fn estimate(&self, input: &OpticalInput<'_>) -> Result<AutoCalibrationResult> {
        if input.image_width_px == 0 {
            return Err(GrindError::invalid_calibration("image width is zero"));
        }
        if let Some(cm) = input.operator_distance_cm {
            if !cm.is_finite() || cm <= 0.0 {
                return Err(GrindError::invalid_calibration(format!(
                    "subject distance must be positive, got {cm} cm"
                )));
            }
        }

        let metadata = &input.metadata;
        let lens = input.selection.map(|selection| selection.lens);
        let mut warnings = Vec::new();

        // Step 1: focal length
        let resolved_focal = metadata
            .focal_length_mm
            .or(lens.map(|l| l.focal_length_mm));
        let focal_mm = resolved_focal.unwrap_or(self.fallback_focal_mm);
        if metadata.focal_length_mm.is_none() {
            warnings.push(match lens {
                Some(l) => format!(
                    "FocalLength missing from EXIF; used {} mm from lens '{}'",
                    l.focal_length_mm, l.name
                ),
                None => format!(
                    "FocalLength missing from EXIF and no lens selected; assumed {focal_mm} mm"
                ),
            });
        }

        // Step 2: 35 mm equivalent
        let equivalent_mm = metadata
            .focal_length_35mm_equivalent_mm
            .or(lens.map(|l| l.equivalent_35mm_focal_length_mm));
        if metadata.focal_length_35mm_equivalent_mm.is_none() {
            warnings.push(match lens {
                Some(l) => format!(
                    "FocalLengthIn35mmFilm missing from EXIF; used {} mm from lens '{}'",
                    l.equivalent_35mm_focal_length_mm, l.name
                ),
                None => "FocalLengthIn35mmFilm missing from EXIF and no lens selected".to_string(),
            });
        }

        // Step 3: subject distance
        let subject_distance_mm = match (metadata.subject_distance_meters, input.operator_distance_cm) {
            (Some(meters), _) => meters * 1000.0,
            (None, Some(cm)) => {
                warnings.push(format!(
                    "SubjectDistance missing from EXIF; used the entered distance of {cm} cm"
                ));
                cm * 10.0
            }
            (None, None) => {
                warnings.push(format!(
                    "SubjectDistance missing from EXIF; assumed {} cm (adjustable)",
                    self.default_distance_mm / 10.0
                ));
                self.default_distance_mm
            }
        };

        // Step 4: sensor diagonal
        let sensor_diagonal_mm = match sensor_diagonal_from_focal_pair(resolved_focal, equivalent_mm) {
            Some(diagonal) => diagonal,
            None => {
                warnings.push(format!(
                    "Incomplete focal data; assumed a typical {} mm sensor diagonal",
                    self.fallback_sensor_diagonal_mm
                ));
                self.fallback_sensor_diagonal_mm
            }
        };

        // Step 5: sensor width
        let aspect_ratio = lens.map(|l| l.aspect_ratio).unwrap_or_default();
        let sensor_width_mm = sensor_diagonal_mm * aspect_ratio.width_factor();

        // Steps 6-7: field of view and scene width
        let hfov = horizontal_fov(sensor_width_mm, focal_mm);
        let scene_width_mm = scene_width_at(subject_distance_mm, hfov);

        // Step 8: scale
        let microns_per_pixel = scene_width_mm * 1000.0 / f64::from(input.image_width_px);

        if !warnings.is_empty() {
            warn!(
                "Optical calibration relies on {} assumption(s): {}",
                warnings.len(),
                warnings.join("; ")
            );
        }

        Ok(AutoCalibrationResult {
            model: metadata
                .camera_name()
                .map(str::to_string)
                .or_else(|| input.selection.map(|s| s.phone.display_name())),
            lens: lens.map(|l| l.name.to_string()),
            focal_length_mm: focal_mm,
            equivalent_35mm_focal_length_mm: equivalent_mm,
            sensor_diagonal_mm,
            sensor_width_mm,
            subject_distance_mm,
            scene_width_mm,
            aspect_ratio,
            image_width_px: input.image_width_px,
            microns_per_pixel,
            warnings,
        })
    }

    /// Estimate for an image file, reading its width and EXIF metadata
    ///
    /// # Errors
    ///
    /// Returns `GrindError::ImageLoadError` if the image dimensions cannot be
    /// read; EXIF problems only add warnings.
    pub fn estimate_for_image(
        &self,
        path: &Path,
        operator_distance_cm: Option<f64>,
        selection: Option<LensSelection<'_>>,
    ) -> Result<AutoCalibrationResult> {
        let (image_width_px, _) = image_loader::image_dimensions(path)?;
        let metadata = ExifExtractor::from_path(path);

        self.estimate(&OpticalInput {
            image_width_px,
            metadata,
            operator_distance_cm,
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::lenses::find_model;

    fn galaxy_wide() -> LensSelection<'static> {
        let phone = find_model("Samsung", "Galaxy S23 / S23 Ultra").unwrap();
        LensSelection {
            phone,
            lens: phone.lens("Wide (1x)").unwrap(),
        }
    }

    #[test]
    fn test_lens_fallback_regression() {
        // 5.4 mm / 24 mm lens, 200 mm away, 4000 px wide, 4:3
        let input = OpticalInput {
            image_width_px: 4000,
            metadata: ImageMetadata::default(),
            operator_distance_cm: None,
            selection: Some(galaxy_wide()),
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();

        assert!((result.sensor_diagonal_mm - 9.734988443752773).abs() < 1e-9);
        assert!((result.sensor_width_mm - 7.787990755002219).abs() < 1e-9);
        assert!((result.scene_width_mm - 288.4441020371192).abs() < 1e-9);
        assert!((result.microns_per_pixel - 72.1110255092798).abs() < 1e-9);
        assert_eq!(result.subject_distance_mm, 200.0);
        assert_eq!(result.lens.as_deref(), Some("Wide (1x)"));
        assert_eq!(result.model.as_deref(), Some("Samsung Galaxy S23 / S23 Ultra"));
        // FocalLength, FocalLengthIn35mmFilm and SubjectDistance all missing
        assert_eq!(result.warnings.len(), 3);
        assert!(result.is_degraded());
    }

    #[test]
    fn test_complete_exif_has_no_warnings() {
        let input = OpticalInput {
            image_width_px: 4000,
            metadata: ImageMetadata {
                make: Some("samsung".into()),
                model: Some("SM-S911B".into()),
                focal_length_mm: Some(5.4),
                focal_length_35mm_equivalent_mm: Some(24.0),
                subject_distance_meters: Some(0.2),
            },
            operator_distance_cm: Some(35.0),
            selection: None,
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();

        assert!(result.warnings.is_empty());
        assert_eq!(result.model.as_deref(), Some("SM-S911B"));
        // EXIF distance wins over the operator value
        assert!((result.subject_distance_mm - 200.0).abs() < 1e-9);
        assert!((result.microns_per_pixel - 72.1110255092798).abs() < 1e-9);
    }

    #[test]
    fn test_no_inputs_uses_typical_sensor() {
        let input = OpticalInput {
            image_width_px: 4000,
            ..Default::default()
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();

        assert_eq!(result.sensor_diagonal_mm, FALLBACK_SENSOR_DIAGONAL_MM);
        assert_eq!(result.focal_length_mm, FALLBACK_FOCAL_LENGTH_MM);
        assert!(result.model.is_none());
        // 200 * (9.0 * 0.8) / 5.5 mm over 4000 px
        assert!((result.microns_per_pixel - 65.45454545454545).abs() < 1e-9);
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_fallback_focal_does_not_form_a_pair() {
        // Only the 35 mm equivalent is known: the 5.5 mm fallback is used for
        // the field of view but not to infer the sensor size
        let input = OpticalInput {
            image_width_px: 3000,
            metadata: ImageMetadata {
                focal_length_35mm_equivalent_mm: Some(26.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();
        assert_eq!(result.sensor_diagonal_mm, FALLBACK_SENSOR_DIAGONAL_MM);
        assert_eq!(result.equivalent_35mm_focal_length_mm, Some(26.0));
    }

    #[test]
    fn test_operator_distance_in_centimeters() {
        let input = OpticalInput {
            image_width_px: 4000,
            operator_distance_cm: Some(10.0),
            selection: Some(galaxy_wide()),
            ..Default::default()
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();
        assert_eq!(result.subject_distance_mm, 100.0);
        // Scale is proportional to distance
        assert!((result.microns_per_pixel - 72.1110255092798 / 2.0).abs() < 1e-9);
        assert!(result.warnings.iter().any(|w| w.contains("10 cm")));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let estimator = OpticalEstimator::new();
        let zero_width = OpticalInput::default();
        assert!(matches!(
            estimator.estimate(&zero_width),
            Err(GrindError::InvalidCalibrationInput { .. })
        ));

        let negative_distance = OpticalInput {
            image_width_px: 4000,
            operator_distance_cm: Some(-5.0),
            ..Default::default()
        };
        assert!(estimator.estimate(&negative_distance).is_err());
    }

    #[test]
    fn test_to_calibration_preserves_scale() {
        let input = OpticalInput {
            image_width_px: 4000,
            selection: Some(galaxy_wide()),
            ..Default::default()
        };
        let result = OpticalEstimator::new().estimate(&input).unwrap();
        let cal = result.to_calibration("S23 auto", None);

        assert_eq!(cal.method, CalibrationMethod::Optical);
        assert_eq!(cal.pixel_distance, 4000.0);
        assert!((cal.microns_per_pixel - result.microns_per_pixel).abs() < 1e-9);
    }

    #[test]
    fn test_custom_fallbacks() {
        let estimator = OpticalEstimator::with_params(4.0, 8.0, 300.0);
        let input = OpticalInput {
            image_width_px: 1000,
            ..Default::default()
        };
        let result = estimator.estimate(&input).unwrap();
        assert_eq!(result.focal_length_mm, 4.0);
        assert_eq!(result.subject_distance_mm, 300.0);
        // 300 * (8 * 0.8) / 4 mm over 1000 px
        assert!((result.microns_per_pixel - 480.0).abs() < 1e-9);
    }
}
