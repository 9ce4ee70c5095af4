//! Particle segmentation with OpenCV
//!
//! Implements particle isolation that:
//! - Converts the photo to grayscale and smooths sensor noise
//! - Binarizes with Otsu's global threshold, optionally inverted
//! - Removes speckles with an elliptical morphological opening
//! - Measures the area of every outer contour

use image::DynamicImage;
use log::debug;
use opencv::{
    core::{bitwise_not, AlgorithmHint, Mat, Point, Scalar, Size, Vector, BORDER_CONSTANT, BORDER_DEFAULT},
    imgproc::{
        contour_area, find_contours, gaussian_blur, get_structuring_element, morphology_ex,
        threshold, CHAIN_APPROX_SIMPLE, MORPH_ELLIPSE, MORPH_OPEN, RETR_EXTERNAL, THRESH_BINARY,
        THRESH_OTSU,
    },
    prelude::*,
};

use crate::detection::ParticleSegmenter;
use crate::error::{GrindError, Result};
use crate::measurement::MeasurementParams;

type VectorOfPoint = Vector<Point>;

/// Otsu threshold and contour based segmenter
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvSegmenter;

impl OpenCvSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Copy the image into a single-channel 8-bit Mat
    fn to_gray_mat(&self, image: &DynamicImage) -> Result<Mat> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(GrindError::SegmentationError {
                message: "image has no pixels".into(),
            });
        }

        let borrowed = Mat::new_rows_cols_with_data(height as i32, width as i32, luma.as_raw())
            .map_err(|e| GrindError::opencv("Mat creation failed", e))?;
        borrowed
            .try_clone()
            .map_err(|e| GrindError::opencv("Mat copy failed", e))
    }

    /// Gaussian blur, Otsu threshold and optional inversion
    fn binarize(&self, gray: &Mat, params: &MeasurementParams) -> Result<Mat> {
        let k = params.blur_kernel_px as i32;
        let mut blurred = Mat::default();
        gaussian_blur(
            gray,
            &mut blurred,
            Size::new(k, k),
            0.0,
            0.0,
            BORDER_DEFAULT,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| GrindError::opencv("Gaussian blur failed", e))?;

        let mut binary = Mat::default();
        let otsu = threshold(&blurred, &mut binary, 0.0, 255.0, THRESH_BINARY | THRESH_OTSU)
            .map_err(|e| GrindError::opencv("Otsu threshold failed", e))?;
        debug!("Otsu threshold at {otsu:.0}");

        if !params.invert_binary {
            return Ok(binary);
        }

        let mut inverted = Mat::default();
        bitwise_not(&binary, &mut inverted, &Mat::default())
            .map_err(|e| GrindError::opencv("Mask inversion failed", e))?;
        Ok(inverted)
    }

    /// Opening with an elliptical kernel to drop specks smaller than the kernel
    fn open(&self, binary: &Mat, params: &MeasurementParams) -> Result<Mat> {
        let k = params.open_kernel_px as i32;
        let kernel = get_structuring_element(MORPH_ELLIPSE, Size::new(k, k), Point::new(-1, -1))
            .map_err(|e| GrindError::opencv("Kernel creation failed", e))?;

        let mut opened = Mat::default();
        morphology_ex(
            binary,
            &mut opened,
            MORPH_OPEN,
            &kernel,
            Point::new(-1, -1),
            1,
            BORDER_CONSTANT,
            Scalar::default(),
        )
        .map_err(|e| GrindError::opencv("Opening failed", e))?;

        Ok(opened)
    }

    /// Areas of outer contours inside the accepted band
    fn contour_areas(&self, binary: &Mat, params: &MeasurementParams) -> Result<Vec<f64>> {
        let mut contours = Vector::<VectorOfPoint>::new();
        find_contours(
            binary,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .map_err(|e| GrindError::opencv("Contour detection failed", e))?;

        let mut areas = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            let area = contour_area(&contour, false)
                .map_err(|e| GrindError::opencv("Area calculation failed", e))?;
            if params.accepts_area(area) {
                areas.push(area);
            }
        }

        debug!("{} of {} contour(s) inside the area band", areas.len(), contours.len());
        Ok(areas)
    }
}

impl ParticleSegmenter for OpenCvSegmenter {
    fn particle_areas(&self, image: &DynamicImage, params: &MeasurementParams) -> Result<Vec<f64>> {
        let params = params.normalized();
        let gray = self.to_gray_mat(image)?;
        let binary = self.binarize(&gray, &params)?;
        let opened = self.open(&binary, &params)?;
        self.contour_areas(&opened, &params)
    }
}
