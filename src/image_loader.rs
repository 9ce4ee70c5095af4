//! Image loading for phone photos
//!
//! Standard formats (JPEG, PNG, TIFF, WebP, BMP) decode through the `image`
//! crate. HEIC/HEIF, the default format of recent iPhones, decodes through
//! `libheif-rs` when the `heif` feature is enabled.
//!
//! EXIF orientation is NOT applied: calibration points and particle areas
//! are measured in the stored pixel grid, and a rotation would not change
//! the scale.

use image::{DynamicImage, ImageReader};
use log::debug;
use std::path::Path;

use crate::error::{GrindError, Result};

/// Container families the loader distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Tiff,
    WebP,
    Bmp,
    /// HEIC/HEIF (Apple)
    Heic,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            "bmp" => Some(ImageFormat::Bmp),
            "heic" | "heif" => Some(ImageFormat::Heic),
            _ => None,
        }
    }

    /// Check if format requires libheif
    pub fn requires_heif(&self) -> bool {
        matches!(self, ImageFormat::Heic)
    }
}

/// Load an image from disk
///
/// # Arguments
///
/// * `path` - Path to the image file
///
/// # Errors
///
/// Returns `GrindError::ImageLoadError` if:
/// - File cannot be opened
/// - Format is not supported (HEIC without the `heif` feature)
/// - Decoding fails
///
/// # Example
///
/// ```rust,no_run
/// use grindscope::image_loader::load_image;
/// use std::path::Path;
///
/// let image = load_image(Path::new("grounds.jpg"))?;
/// println!("Loaded image: {}x{}", image.width(), image.height());
/// # Ok::<(), grindscope::GrindError>(())
/// ```
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = match ImageFormat::from_extension(path) {
        Some(format) if format.requires_heif() => load_heic(path)?,
        _ => load_standard(path)?,
    };
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Pixel dimensions `(width, height)` without decoding the whole image when possible
///
/// # Errors
///
/// Returns `GrindError::ImageLoadError` if the header cannot be read.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    match ImageFormat::from_extension(path) {
        Some(format) if format.requires_heif() => heic_dimensions(path),
        _ => open_reader(path)?.into_dimensions().map_err(|e| {
            GrindError::image_load(format!("Failed to read dimensions of {}", path.display()), e)
        }),
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>> {
    ImageReader::open(path)
        .map_err(|e| GrindError::image_load(format!("Failed to open {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| GrindError::image_load(format!("Failed to sniff format of {}", path.display()), e))
}

/// Load image using the `image` crate (standard formats)
fn load_standard(path: &Path) -> Result<DynamicImage> {
    open_reader(path)?
        .decode()
        .map_err(|e| GrindError::image_load(format!("Failed to decode {}", path.display()), e))
}

#[cfg(feature = "heif")]
fn read_heif_context(path: &Path) -> Result<libheif_rs::HeifContext<'static>> {
    let path_str = path.to_str().ok_or_else(|| GrindError::ImageLoadError {
        message: format!("Invalid file path encoding: {}", path.display()),
        source: None,
    })?;
    libheif_rs::HeifContext::read_from_file(path_str)
        .map_err(|e| GrindError::image_load(format!("Failed to read HEIC file: {}", path.display()), e))
}

/// Load HEIC/HEIF image using libheif
#[cfg(feature = "heif")]
fn load_heic(path: &Path) -> Result<DynamicImage> {
    use libheif_rs::{ColorSpace, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = read_heif_context(path)?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| GrindError::image_load("Failed to get primary image handle", e))?;

    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| GrindError::image_load("Failed to decode HEIC image", e))?;

    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or_else(|| GrindError::ImageLoadError {
        message: "HEIC image has no interleaved RGB data".into(),
        source: None,
    })?;

    let width = handle.width();
    let height = handle.height();
    let row_bytes = width as usize * 3;

    // Drop stride padding row by row
    let mut rgb = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        rgb.extend_from_slice(&row[..row_bytes]);
    }

    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| GrindError::ImageLoadError {
            message: format!("HEIC buffer does not match {width}x{height}"),
            source: None,
        })
}

#[cfg(feature = "heif")]
fn heic_dimensions(path: &Path) -> Result<(u32, u32)> {
    let ctx = read_heif_context(path)?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| GrindError::image_load("Failed to get primary image handle", e))?;
    Ok((handle.width(), handle.height()))
}

#[cfg(not(feature = "heif"))]
fn load_heic(path: &Path) -> Result<DynamicImage> {
    Err(heif_unavailable(path))
}

#[cfg(not(feature = "heif"))]
fn heic_dimensions(path: &Path) -> Result<(u32, u32)> {
    Err(heif_unavailable(path))
}

#[cfg(not(feature = "heif"))]
fn heif_unavailable(path: &Path) -> GrindError {
    GrindError::ImageLoadError {
        message: format!(
            "{} is HEIC/HEIF; rebuild with the `heif` feature or convert it to JPEG",
            path.display()
        ),
        source: None,
    }
}
