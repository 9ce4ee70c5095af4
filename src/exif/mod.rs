//! EXIF metadata extraction module
//!
//! Reads the handful of tags the optical calibration needs: camera make and
//! model, focal length, 35 mm equivalent focal length and subject distance.

pub mod extractor;

pub use extractor::{ExifExtractor, ImageMetadata};
