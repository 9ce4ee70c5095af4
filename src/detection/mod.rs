//! Particle detection module
//!
//! The measurement pipeline only depends on [`ParticleSegmenter`]. The
//! OpenCV implementation is compiled with the `opencv` feature.

use image::DynamicImage;

use crate::error::Result;
use crate::measurement::MeasurementParams;

#[cfg(feature = "opencv")]
pub mod particles;

#[cfg(feature = "opencv")]
pub use particles::OpenCvSegmenter;

/// Turns a photo of spread grounds into particle areas in square pixels
///
/// Implementations binarize the image, apply a morphological opening with
/// `params.open_kernel_px`, and report outer contours only. Areas outside
/// `[params.min_area_px, params.max_area_px]` may be dropped here; the
/// orchestrator filters again either way.
pub trait ParticleSegmenter {
    fn particle_areas(&self, image: &DynamicImage, params: &MeasurementParams) -> Result<Vec<f64>>;
}

impl<T: ParticleSegmenter + ?Sized> ParticleSegmenter for &T {
    fn particle_areas(&self, image: &DynamicImage, params: &MeasurementParams) -> Result<Vec<f64>> {
        (**self).particle_areas(image, params)
    }
}

impl<T: ParticleSegmenter + ?Sized> ParticleSegmenter for Box<T> {
    fn particle_areas(&self, image: &DynamicImage, params: &MeasurementParams) -> Result<Vec<f64>> {
        (**self).particle_areas(image, params)
    }
}
