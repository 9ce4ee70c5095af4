//! # grindscope
//!
//! A Rust crate for measuring the particle-size distribution of ground coffee
//! from photographs.
//!
//! This library provides calibrated size measurement by:
//! - Converting pixels to microns with a two-point ruler calibration or an
//!   optical estimate from EXIF and phone lens data
//! - Segmenting particles into equivalent-circle diameters
//! - Summarizing diameters into D10/D50/D90, span, mode and fine/coarse shares
//! - Keeping a history of calibrations and measurements with CSV export
//!
//! ## Example
//!
//! ```rust
//! use grindscope::{analyze_areas, MeasurementParams, Point2D, Thresholds, TwoPointCalibration};
//!
//! let calibration = TwoPointCalibration::from_points(
//!     &[Point2D::new(100.0, 100.0), Point2D::new(100.0, 600.0)],
//!     10.0,
//! )?
//! .into_calibration("Ruler", None);
//! assert_eq!(calibration.microns_per_pixel, 20.0);
//!
//! let outcome = analyze_areas(
//!     &[120.0, 340.0, 90.0],
//!     &calibration,
//!     &MeasurementParams::default(),
//!     &Thresholds::default(),
//! )?;
//! if let Some(analysis) = outcome.analysis() {
//!     println!("D50 = {:.0} µm", analysis.stats.p50);
//! }
//! # Ok::<(), grindscope::GrindError>(())
//! ```

pub mod calibration;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod exif;
pub mod export;
pub mod geometry;
pub mod image_loader;
pub mod logging;
pub mod measurement;
pub mod stats;
pub mod storage;

pub use calibration::{
    AutoCalibrationResult, Calibration, CalibrationMethod, LensSelection, OpticalEstimator,
    OpticalInput, PhoneLensSpec, PhoneModelSpec, TwoPointCalibration,
};
pub use config::AnalysisConfig;
pub use detection::ParticleSegmenter;
#[cfg(feature = "opencv")]
pub use detection::OpenCvSegmenter;
pub use error::{GrindError, Result};
pub use crate::exif::{ExifExtractor, ImageMetadata};
pub use export::measurements_csv;
pub use geometry::{AspectRatio, Point2D};
pub use measurement::{
    analyze_areas, Analysis, AnalysisOutcome, Measurement, MeasurementOrchestrator,
    MeasurementParams, SampleLabels, Thresholds,
};
pub use stats::{Classification, DistributionStats, Histogram, HistogramBin};
pub use storage::{DeletionPolicy, RecordStore};
