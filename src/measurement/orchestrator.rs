//! Measurement pipeline: segmentation, unit conversion and statistics
//!
//! The orchestrator owns no state besides its segmentation backend. Each
//! call processes one image and returns either a finished analysis or an
//! explicit "no particles" outcome, which is not an error.

use chrono::Utc;
use image::DynamicImage;
use log::{debug, info, warn};
use std::f64::consts::PI;
use std::path::Path;
use uuid::Uuid;

use crate::calibration::Calibration;
use crate::detection::ParticleSegmenter;
use crate::error::{GrindError, Result};
use crate::image_loader;
use crate::measurement::types::{Measurement, MeasurementParams, SampleLabels, Thresholds};
use crate::stats::{Classification, DistributionStats, Histogram};
use crate::storage::RecordStore;

/// Find a calibration by id
///
/// # Errors
///
/// Returns `GrindError::CalibrationNotFound` when no record has this id.
pub fn select_calibration<'a>(calibrations: &'a [Calibration], id: &str) -> Result<&'a Calibration> {
    calibrations
        .iter()
        .find(|calibration| calibration.id == id)
        .ok_or_else(|| GrindError::CalibrationNotFound { id: id.to_string() })
}

/// Diameter in microns of the circle with the same area as the particle
pub fn equivalent_diameter_um(area_px: f64, microns_per_pixel: f64) -> f64 {
    2.0 * (area_px / PI).sqrt() * microns_per_pixel
}

/// Finished analysis of one sample, ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub calibration_id: String,
    pub microns_per_pixel: f64,
    pub params: MeasurementParams,
    pub thresholds: Thresholds,
    /// Equivalent diameters in microns, in segmentation order
    pub diameters_um: Vec<f64>,
    pub stats: DistributionStats,
    pub histogram: Histogram,
    pub classification: Classification,
    /// Areas dropped by the `[min_area_px, max_area_px]` band
    pub rejected_count: usize,
}

impl Analysis {
    /// Assemble the immutable record for this analysis
    pub fn to_measurement(&self, labels: SampleLabels) -> Measurement {
        Measurement {
            id: Uuid::new_v4().to_string(),
            date_created: Utc::now(),
            grinder: labels.grinder,
            setting: labels.setting,
            coffee_label: labels.coffee_label,
            calibration_id: self.calibration_id.clone(),
            microns_per_pixel: self.microns_per_pixel,
            thresholds: self.thresholds,
            params: self.params,
            stats: self.stats,
            sample_size: self.stats.count,
            fine_pct: self.classification.fine_pct,
            coarse_pct: self.classification.coarse_pct,
        }
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Particles(Analysis),
    /// Nothing survived segmentation and area filtering
    NoParticles {
        /// Areas reported by the segmenter before filtering
        detected: usize,
    },
}

impl AnalysisOutcome {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            AnalysisOutcome::Particles(analysis) => Some(analysis),
            AnalysisOutcome::NoParticles { .. } => None,
        }
    }

    pub fn into_analysis(self) -> Option<Analysis> {
        match self {
            AnalysisOutcome::Particles(analysis) => Some(analysis),
            AnalysisOutcome::NoParticles { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnalysisOutcome::NoParticles { .. })
    }
}

/// Run statistics on an already segmented list of particle areas
///
/// # Arguments
///
/// * `areas_px` - Particle areas in square pixels
/// * `calibration` - Scale used to convert areas to diameters
/// * `params` - Area band and bin width
/// * `thresholds` - Fine and coarse cut points
///
/// # Errors
///
/// Returns `GrindError::InvalidParameter` for invalid params or thresholds,
/// and `GrindError::InvalidCalibrationInput` for a calibration whose scale is
/// not a positive finite number.
pub fn analyze_areas(
    areas_px: &[f64],
    calibration: &Calibration,
    params: &MeasurementParams,
    thresholds: &Thresholds,
) -> Result<AnalysisOutcome> {
    let params = params.normalized();
    params.validate()?;
    thresholds.validate()?;

    let scale = calibration.microns_per_pixel;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(GrindError::invalid_calibration(format!(
            "calibration '{}' has scale {scale} µm/px",
            calibration.name
        )));
    }

    let diameters_um: Vec<f64> = areas_px
        .iter()
        .copied()
        .filter(|&area| params.accepts_area(area))
        .map(|area| equivalent_diameter_um(area, scale))
        .collect();
    let rejected_count = areas_px.len() - diameters_um.len();

    if diameters_um.is_empty() {
        warn!(
            "No particles left after filtering {} area(s) to [{}, {}] px",
            areas_px.len(),
            params.min_area_px,
            params.max_area_px
        );
        return Ok(AnalysisOutcome::NoParticles {
            detected: areas_px.len(),
        });
    }

    let (stats, histogram) =
        DistributionStats::compute_with_histogram(&diameters_um, params.bin_width_microns)?;
    let classification = Classification::compute(&diameters_um, thresholds);

    debug!(
        "Kept {} of {} particle(s), {} histogram bin(s)",
        stats.count,
        areas_px.len(),
        histogram.bins.len()
    );

    Ok(AnalysisOutcome::Particles(Analysis {
        calibration_id: calibration.id.clone(),
        microns_per_pixel: scale,
        params,
        thresholds: *thresholds,
        diameters_um,
        stats,
        histogram,
        classification,
        rejected_count,
    }))
}

/// Persist an analysis as the most recent measurement
///
/// # Errors
///
/// Returns `GrindError::StorageError` if the measurement collection cannot be written.
pub fn record(store: &RecordStore, analysis: &Analysis, labels: SampleLabels) -> Result<Measurement> {
    let measurement = analysis.to_measurement(labels);
    store.add_measurement(measurement.clone())?;
    info!(
        "Saved measurement {} (n={}, D50={:.1} µm)",
        measurement.id, measurement.sample_size, measurement.stats.p50
    );
    Ok(measurement)
}

/// Image-to-statistics pipeline around a segmentation backend
pub struct MeasurementOrchestrator<S: ParticleSegmenter> {
    segmenter: S,
}

impl<S: ParticleSegmenter> MeasurementOrchestrator<S> {
    pub fn new(segmenter: S) -> Self {
        Self { segmenter }
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Segment an image and summarize its particle sizes
    ///
    /// # Errors
    ///
    /// Returns `GrindError` if:
    /// - params or thresholds are invalid (checked before segmenting)
    /// - the segmentation backend fails
    pub fn analyze(
        &self,
        image: &DynamicImage,
        calibration: &Calibration,
        params: &MeasurementParams,
        thresholds: &Thresholds,
    ) -> Result<AnalysisOutcome> {
        let normalized = params.normalized();
        normalized.validate()?;
        thresholds.validate()?;

        let areas = self.segmenter.particle_areas(image, &normalized)?;
        debug!(
            "Segmenter returned {} area(s) for a {}x{} image",
            areas.len(),
            image.width(),
            image.height()
        );

        let outcome = analyze_areas(&areas, calibration, &normalized, thresholds)?;
        if let AnalysisOutcome::Particles(analysis) = &outcome {
            info!(
                "Analyzed {} particle(s) with '{}': D50 {:.1} µm, span {:.2}",
                analysis.stats.count, calibration.name, analysis.stats.p50, analysis.stats.span
            );
        }
        Ok(outcome)
    }

    /// Load an image file and analyze it
    ///
    /// # Errors
    ///
    /// Returns `GrindError::ImageLoadError` if the file cannot be decoded, plus
    /// every error of [`MeasurementOrchestrator::analyze`].
    pub fn analyze_path(
        &self,
        path: &Path,
        calibration: &Calibration,
        params: &MeasurementParams,
        thresholds: &Thresholds,
    ) -> Result<AnalysisOutcome> {
        let image = image_loader::load_image(path)?;
        self.analyze(&image, calibration, params, thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationMethod;

    struct FixedAreas(Vec<f64>);

    impl ParticleSegmenter for FixedAreas {
        fn particle_areas(&self, _image: &DynamicImage, _params: &MeasurementParams) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSegmenter;

    impl ParticleSegmenter for FailingSegmenter {
        fn particle_areas(&self, _image: &DynamicImage, _params: &MeasurementParams) -> Result<Vec<f64>> {
            Err(GrindError::SegmentationError {
                message: "backend unavailable".into(),
            })
        }
    }

    fn calibration(microns_per_pixel: f64) -> Calibration {
        Calibration::create(
            "test",
            None,
            1000.0,
            microns_per_pixel,
            CalibrationMethod::TwoPoint,
        )
    }

    /// Area in px² of a particle with diameter `d` µm at `mpp` µm/px
    fn area_for_diameter(d: f64, mpp: f64) -> f64 {
        let radius_px = d / mpp / 2.0;
        PI * radius_px * radius_px
    }

    #[test]
    fn test_equivalent_diameter() {
        assert!((equivalent_diameter_um(PI, 1.0) - 2.0).abs() < 1e-12);
        assert!((equivalent_diameter_um(100.0 * PI, 20.0) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_calibration() {
        let calibrations = vec![calibration(20.0), calibration(10.0)];
        let id = calibrations[1].id.clone();
        assert_eq!(select_calibration(&calibrations, &id).unwrap().microns_per_pixel, 10.0);
        assert!(matches!(
            select_calibration(&calibrations, "missing"),
            Err(GrindError::CalibrationNotFound { .. })
        ));
    }

    #[test]
    fn test_analyze_areas_scenario() {
        let cal = calibration(20.0);
        let areas: Vec<f64> = [100.0, 150.0, 150.0, 200.0, 800.0]
            .iter()
            .map(|&d| area_for_diameter(d, 20.0))
            .collect();

        // Cut points sit away from the sample values so area round-off cannot flip a class
        let thresholds = Thresholds::new(190.0, 700.0);
        let outcome = analyze_areas(&areas, &cal, &MeasurementParams::default(), &thresholds).unwrap();
        let analysis = outcome.analysis().unwrap();

        assert_eq!(analysis.stats.count, 5);
        assert_eq!(analysis.rejected_count, 0);
        assert!((analysis.classification.fine_pct - 40.0).abs() < 1e-9);
        assert!((analysis.classification.coarse_pct - 20.0).abs() < 1e-9);
        assert!((analysis.stats.p50 - 150.0).abs() < 1e-9);
        assert_eq!(analysis.histogram.total_count(), 5);
    }

    #[test]
    fn test_area_band_filters_before_conversion() {
        let cal = calibration(10.0);
        let params = MeasurementParams {
            min_area_px: 10.0,
            max_area_px: 100.0,
            ..Default::default()
        };
        let outcome = analyze_areas(&[5.0, 10.0, 50.0, 100.0, 500.0], &cal, &params, &Thresholds::default())
            .unwrap();
        let analysis = outcome.into_analysis().unwrap();
        assert_eq!(analysis.stats.count, 3);
        assert_eq!(analysis.rejected_count, 2);
    }

    #[test]
    fn test_everything_filtered_is_no_particles() {
        let cal = calibration(10.0);
        let outcome = analyze_areas(&[1.0, 2.0, 3.0], &cal, &MeasurementParams::default(), &Thresholds::default())
            .unwrap();
        assert_eq!(outcome, AnalysisOutcome::NoParticles { detected: 3 });
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_invalid_inputs_rejected_before_segmenting() {
        let orchestrator = MeasurementOrchestrator::new(FailingSegmenter);
        let image = DynamicImage::new_luma8(4, 4);
        let cal = calibration(10.0);

        // Invalid thresholds win over the backend failure
        let err = orchestrator
            .analyze(&image, &cal, &MeasurementParams::default(), &Thresholds::new(-1.0, 700.0))
            .unwrap_err();
        assert!(matches!(err, GrindError::InvalidParameter { .. }));

        let err = orchestrator
            .analyze(&image, &cal, &MeasurementParams::default(), &Thresholds::default())
            .unwrap_err();
        assert!(matches!(err, GrindError::SegmentationError { .. }));
    }

    #[test]
    fn test_analyze_with_segmenter() {
        let areas = vec![area_for_diameter(300.0, 25.0); 4];
        let orchestrator = MeasurementOrchestrator::new(FixedAreas(areas));
        let image = DynamicImage::new_luma8(16, 16);

        let outcome = orchestrator
            .analyze(&image, &calibration(25.0), &MeasurementParams::default(), &Thresholds::default())
            .unwrap();
        let analysis = outcome.analysis().unwrap();
        assert_eq!(analysis.stats.count, 4);
        assert!((analysis.stats.mean - 300.0).abs() < 1e-9);
        assert_eq!(analysis.stats.std_dev, 0.0);
    }

    #[test]
    fn test_params_are_normalized() {
        let orchestrator = MeasurementOrchestrator::new(FixedAreas(vec![50.0, 60.0]));
        let params = MeasurementParams {
            blur_kernel_px: 4,
            ..Default::default()
        };
        let outcome = orchestrator
            .analyze(&DynamicImage::new_luma8(8, 8), &calibration(10.0), &params, &Thresholds::default())
            .unwrap();
        assert_eq!(outcome.analysis().unwrap().params.blur_kernel_px, 5);
    }

    #[test]
    fn test_to_measurement_copies_scale() {
        let cal = calibration(12.5);
        let outcome = analyze_areas(&[100.0, 400.0], &cal, &MeasurementParams::default(), &Thresholds::default())
            .unwrap();
        let measurement = outcome
            .analysis()
            .unwrap()
            .to_measurement(SampleLabels::new(Some("EK43".into()), Some("8.5".into()), None));

        assert_eq!(measurement.calibration_id, cal.id);
        assert_eq!(measurement.microns_per_pixel, 12.5);
        assert_eq!(measurement.sample_size, 2);
        assert_eq!(measurement.grinder.as_deref(), Some("EK43"));
        assert!(Uuid::parse_str(&measurement.id).is_ok());
    }

    #[test]
    fn test_corrupt_calibration_scale_rejected() {
        let mut cal = calibration(10.0);
        cal.microns_per_pixel = 0.0;
        let err = analyze_areas(&[50.0], &cal, &MeasurementParams::default(), &Thresholds::default())
            .unwrap_err();
        assert!(matches!(err, GrindError::InvalidCalibrationInput { .. }));
    }
}
