//! Optical constants and default analysis parameters
//!
//! Compile-time values shared by the calibration engine, the statistics
//! engine and the configuration defaults.

/// Camera optics reference values
pub mod optics {
    /// Diagonal of a 36x24 mm full-frame sensor in millimeters
    pub const FULL_FRAME_DIAGONAL_MM: f64 = 43.266615305567875;

    /// Focal length assumed when neither EXIF nor a lens selection provides one
    pub const FALLBACK_FOCAL_LENGTH_MM: f64 = 5.5;

    /// Typical main-camera sensor diagonal (between 1/1.7" and 1/1.9")
    pub const FALLBACK_SENSOR_DIAGONAL_MM: f64 = 9.0;

    /// Subject distance assumed when neither EXIF nor the operator provides one
    pub const DEFAULT_SUBJECT_DISTANCE_MM: f64 = 200.0;

    /// EXIF SubjectDistance numerator reserved for "infinity"
    pub const EXIF_INFINITE_DISTANCE: u32 = u32::MAX;
}

/// Segmentation defaults
pub mod segmentation {
    /// Gaussian blur kernel size (odd)
    pub const BLUR_KERNEL_PX: u32 = 5;

    /// Morphological opening kernel size (odd)
    pub const OPEN_KERNEL_PX: u32 = 3;

    /// Smallest particle area kept, filters dust specks
    pub const MIN_AREA_PX: f64 = 8.0;

    /// Largest particle area kept
    pub const MAX_AREA_PX: f64 = 1_000_000.0;

    /// Particles are darker than the background in the recommended setup
    pub const INVERT_BINARY: bool = true;
}

/// Distribution statistics defaults and limits
pub mod statistics {
    /// Histogram bin width in microns
    pub const BIN_WIDTH_MICRONS: f64 = 25.0;

    /// Upper bound on histogram bins
    pub const MAX_HISTOGRAM_BINS: usize = 100_000;

    /// Particles strictly below this diameter count as fines
    pub const FINE_THRESHOLD_MICRONS: f64 = 200.0;

    /// Particles strictly above this diameter count as boulders
    pub const COARSE_THRESHOLD_MICRONS: f64 = 700.0;

    /// Lower percentile reported as D10
    pub const P10: f64 = 0.10;

    /// Median reported as D50
    pub const P50: f64 = 0.50;

    /// Upper percentile reported as D90
    pub const P90: f64 = 0.90;
}

/// Record storage file names
pub mod storage {
    pub const CALIBRATIONS_FILE: &str = "calibrations.json";
    pub const MEASUREMENTS_FILE: &str = "measurements.json";
}
