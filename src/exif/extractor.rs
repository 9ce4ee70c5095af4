//! EXIF metadata extraction and parsing
//!
//! Extraction never fails: unreadable or absent metadata yields an empty
//! `ImageMetadata`, so calibration degrades to lens-table fallbacks.

use ::exif::{Exif, In, Reader, Tag, Value};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use crate::constants::optics::EXIF_INFINITE_DISTANCE;

/// EXIF metadata relevant to scale estimation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// Camera manufacturer (`Make`)
    pub make: Option<String>,
    /// Camera model (`Model`)
    pub model: Option<String>,
    /// Actual lens focal length in millimeters (`FocalLength`)
    #[serde(rename = "focalLengthMM")]
    pub focal_length_mm: Option<f64>,
    /// 35 mm equivalent focal length (`FocalLengthIn35mmFilm`)
    #[serde(rename = "focalLengthIn35mmEquivalentMM")]
    pub focal_length_35mm_equivalent_mm: Option<f64>,
    /// Distance to the subject in meters (`SubjectDistance`)
    pub subject_distance_meters: Option<f64>,
}

impl ImageMetadata {
    /// True when no recognized tag was found
    pub fn is_empty(&self) -> bool {
        self == &ImageMetadata::default()
    }

    /// Camera name, model preferred over make
    pub fn camera_name(&self) -> Option<&str> {
        self.model.as_deref().or(self.make.as_deref())
    }
}

/// EXIF metadata extractor
pub struct ExifExtractor;

impl ExifExtractor {
    /// Extract metadata from raw image bytes (JPEG, HEIF, PNG, WebP, TIFF)
    ///
    /// Any parse failure is logged and resolves to empty metadata.
    pub fn from_bytes(bytes: &[u8]) -> ImageMetadata {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(err) => {
                debug!("No readable EXIF data: {err}");
                return ImageMetadata::default();
            }
        };

        let metadata = ImageMetadata {
            make: Self::ascii_field(&exif, Tag::Make),
            model: Self::ascii_field(&exif, Tag::Model),
            focal_length_mm: Self::rational_field(&exif, Tag::FocalLength),
            focal_length_35mm_equivalent_mm: Self::uint_field(&exif, Tag::FocalLengthIn35mmFilm),
            subject_distance_meters: Self::subject_distance(&exif),
        };

        debug!("Extracted EXIF metadata: {metadata:?}");
        metadata
    }

    /// Extract metadata from an image file
    ///
    /// A file that cannot be read is logged and resolves to empty metadata.
    pub fn from_path(path: &Path) -> ImageMetadata {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(err) => {
                warn!("Could not read {} for EXIF extraction: {err}", path.display());
                ImageMetadata::default()
            }
        }
    }

    fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts
                .iter()
                .map(|raw| {
                    String::from_utf8_lossy(raw)
                        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                        .to_string()
                })
                .find(|text| !text.is_empty()),
            _ => None,
        }
    }

    fn rational_field(exif: &Exif, tag: Tag) -> Option<f64> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let value = match &field.value {
            Value::Rational(values) => values.first()?,
            _ => return None,
        };
        Self::rational_to_float(value.num, value.denom).filter(|v| *v > 0.0)
    }

    fn uint_field(exif: &Exif, tag: Tag) -> Option<f64> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        field
            .value
            .get_uint(0)
            .filter(|v| *v > 0)
            .map(f64::from)
    }

    /// SubjectDistance in meters; 0 (unknown) and 0xFFFFFFFF (infinity) are absent
    fn subject_distance(exif: &Exif) -> Option<f64> {
        let field = exif.get_field(Tag::SubjectDistance, In::PRIMARY)?;
        match &field.value {
            Value::Rational(values) => {
                let r = values.first()?;
                if r.num == EXIF_INFINITE_DISTANCE {
                    return None;
                }
                Self::rational_to_float(r.num, r.denom).filter(|v| *v > 0.0)
            }
            _ => None,
        }
    }

    /// Convert EXIF rational to float
    fn rational_to_float(numerator: u32, denominator: u32) -> Option<f64> {
        if denominator == 0 {
            None
        } else {
            Some(f64::from(numerator) / f64::from(denominator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::exif::experimental::Writer;
    use ::exif::{Field, Rational};

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn rational(num: u32, denom: u32) -> Value {
        Value::Rational(vec![Rational { num, denom }])
    }

    /// Serialize fields into a bare little-endian TIFF/EXIF blob
    fn exif_blob(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    fn model(name: &str) -> Field {
        field(Tag::Model, Value::Ascii(vec![name.as_bytes().to_vec()]))
    }

    #[test]
    fn test_rational_conversion() {
        assert_eq!(ExifExtractor::rational_to_float(1, 2), Some(0.5));
        assert_eq!(ExifExtractor::rational_to_float(54, 10), Some(5.4));
        assert_eq!(ExifExtractor::rational_to_float(1, 0), None);
    }

    #[test]
    fn test_garbage_bytes_yield_empty_metadata() {
        let metadata = ExifExtractor::from_bytes(b"definitely not an image");
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_empty_bytes_yield_empty_metadata() {
        assert!(ExifExtractor::from_bytes(&[]).is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_metadata() {
        let metadata = ExifExtractor::from_path(Path::new("does/not/exist.jpg"));
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_camera_name_prefers_model() {
        let metadata = ImageMetadata {
            make: Some("Apple".into()),
            model: Some("iPhone 15 Pro".into()),
            ..Default::default()
        };
        assert_eq!(metadata.camera_name(), Some("iPhone 15 Pro"));

        let make_only = ImageMetadata {
            make: Some("Google".into()),
            ..Default::default()
        };
        assert_eq!(make_only.camera_name(), Some("Google"));
        assert!(!make_only.is_empty());
    }

    #[test]
    fn test_parses_focal_lengths_and_model() {
        let blob = exif_blob(&[
            model("Pixel 8"),
            field(Tag::FocalLength, rational(54, 10)),
            field(Tag::FocalLengthIn35mmFilm, Value::Short(vec![24])),
            field(Tag::SubjectDistance, rational(35, 100)),
        ]);

        let metadata = ExifExtractor::from_bytes(&blob);
        assert_eq!(metadata.make, None);
        assert_eq!(metadata.model.as_deref(), Some("Pixel 8"));
        assert_eq!(metadata.focal_length_mm, Some(5.4));
        assert_eq!(metadata.focal_length_35mm_equivalent_mm, Some(24.0));
        assert_eq!(metadata.subject_distance_meters, Some(0.35));
    }

    #[test]
    fn test_infinite_subject_distance_is_absent() {
        let blob = exif_blob(&[
            model("Pixel 8"),
            field(Tag::SubjectDistance, rational(u32::MAX, 1)),
        ]);
        let metadata = ExifExtractor::from_bytes(&blob);
        assert_eq!(metadata.model.as_deref(), Some("Pixel 8"));
        assert_eq!(metadata.subject_distance_meters, None);
    }

    #[test]
    fn test_zero_subject_distance_is_absent() {
        let blob = exif_blob(&[model("Pixel 8"), field(Tag::SubjectDistance, rational(0, 1))]);
        assert_eq!(ExifExtractor::from_bytes(&blob).subject_distance_meters, None);
    }

    #[test]
    fn test_zero_denominator_focal_length_is_absent() {
        let blob = exif_blob(&[
            model("iPhone 15"),
            field(Tag::FocalLength, rational(54, 0)),
            field(Tag::FocalLengthIn35mmFilm, Value::Short(vec![0])),
        ]);
        let metadata = ExifExtractor::from_bytes(&blob);
        assert_eq!(metadata.model.as_deref(), Some("iPhone 15"));
        assert_eq!(metadata.focal_length_mm, None);
        assert_eq!(metadata.focal_length_35mm_equivalent_mm, None);
    }
}
