//! Pixel-to-micron calibration module
//!
//! Two independent methods produce the same `Calibration` record: an exact
//! two-point measurement against a ruler, and an optical estimate derived
//! from EXIF metadata or a phone lens table.

pub mod lenses;
pub mod optical;
pub mod record;
pub mod two_point;

pub use lenses::{PhoneLensSpec, PhoneModelSpec};
pub use optical::{AutoCalibrationResult, LensSelection, OpticalEstimator, OpticalInput};
pub use record::{Calibration, CalibrationMethod};
pub use two_point::TwoPointCalibration;
