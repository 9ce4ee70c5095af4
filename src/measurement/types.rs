//! Measurement value objects and the persisted measurement record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{segmentation, statistics};
use crate::error::{GrindError, Result};
use crate::stats::DistributionStats;

/// Segmentation and binning parameters, stored verbatim with each measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementParams {
    /// Gaussian blur kernel size (odd, at least 1)
    pub blur_kernel_px: u32,
    /// Morphological opening kernel size (odd, at least 1)
    pub open_kernel_px: u32,
    pub min_area_px: f64,
    pub max_area_px: f64,
    /// Treat dark particles on a light background as foreground
    pub invert_binary: bool,
    pub bin_width_microns: f64,
}

impl Default for MeasurementParams {
    fn default() -> Self {
        Self {
            blur_kernel_px: segmentation::BLUR_KERNEL_PX,
            open_kernel_px: segmentation::OPEN_KERNEL_PX,
            min_area_px: segmentation::MIN_AREA_PX,
            max_area_px: segmentation::MAX_AREA_PX,
            invert_binary: segmentation::INVERT_BINARY,
            bin_width_microns: statistics::BIN_WIDTH_MICRONS,
        }
    }
}

impl MeasurementParams {
    /// Copy with both kernel sizes coerced to odd values of at least 1
    pub fn normalized(&self) -> Self {
        Self {
            blur_kernel_px: coerce_odd_kernel(self.blur_kernel_px),
            open_kernel_px: coerce_odd_kernel(self.open_kernel_px),
            ..*self
        }
    }

    /// Check area bounds and bin width
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidParameter` if:
    /// - `min_area_px` is negative or not finite
    /// - `max_area_px` is not greater than `min_area_px`
    /// - `bin_width_microns` is not a positive finite number
    pub fn validate(&self) -> Result<()> {
        if !self.min_area_px.is_finite() || self.min_area_px < 0.0 {
            return Err(GrindError::invalid_parameter("minAreaPx", self.min_area_px));
        }
        if self.max_area_px.is_nan() || self.max_area_px <= self.min_area_px {
            return Err(GrindError::invalid_parameter("maxAreaPx", self.max_area_px));
        }
        if !self.bin_width_microns.is_finite() || self.bin_width_microns <= 0.0 {
            return Err(GrindError::invalid_parameter(
                "binWidthMicrons",
                self.bin_width_microns,
            ));
        }
        Ok(())
    }

    /// True when `area_px` lies inside `[min_area_px, max_area_px]`
    pub fn accepts_area(&self, area_px: f64) -> bool {
        area_px >= self.min_area_px && area_px <= self.max_area_px
    }
}

/// Nearest odd kernel size of at least 1 (`max(1, k) | 1`)
pub fn coerce_odd_kernel(size: u32) -> u32 {
    size.max(1) | 1
}

/// Fine and coarse classification cut points in microns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub fine_microns: f64,
    pub coarse_microns: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fine_microns: statistics::FINE_THRESHOLD_MICRONS,
            coarse_microns: statistics::COARSE_THRESHOLD_MICRONS,
        }
    }
}

impl Thresholds {
    pub fn new(fine_microns: f64, coarse_microns: f64) -> Self {
        Self {
            fine_microns,
            coarse_microns,
        }
    }

    /// # Errors
    ///
    /// Returns `GrindError::InvalidParameter` if either threshold is not a
    /// positive finite number or the fine threshold exceeds the coarse one.
    pub fn validate(&self) -> Result<()> {
        if !self.fine_microns.is_finite() || self.fine_microns <= 0.0 {
            return Err(GrindError::invalid_parameter("fineMicrons", self.fine_microns));
        }
        if !self.coarse_microns.is_finite() || self.coarse_microns <= 0.0 {
            return Err(GrindError::invalid_parameter(
                "coarseMicrons",
                self.coarse_microns,
            ));
        }
        if self.fine_microns > self.coarse_microns {
            return Err(GrindError::invalid_parameter(
                "fineMicrons",
                format!("{} (above coarse {})", self.fine_microns, self.coarse_microns),
            ));
        }
        Ok(())
    }
}

/// Free-text labels describing the ground sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleLabels {
    pub grinder: Option<String>,
    pub setting: Option<String>,
    pub coffee_label: Option<String>,
}

impl SampleLabels {
    pub fn new(
        grinder: Option<String>,
        setting: Option<String>,
        coffee_label: Option<String>,
    ) -> Self {
        Self {
            grinder: non_blank(grinder),
            setting: non_blank(setting),
            coffee_label: non_blank(coffee_label),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One saved grind measurement
///
/// Immutable once saved. `microns_per_pixel` is copied from the calibration
/// so the record stays interpretable if the calibration is removed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: String,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grinder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coffee_label: Option<String>,
    pub calibration_id: String,
    pub microns_per_pixel: f64,
    pub thresholds: Thresholds,
    pub params: MeasurementParams,
    pub stats: DistributionStats,
    pub sample_size: usize,
    pub fine_pct: f64,
    pub coarse_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = MeasurementParams::default();
        assert_eq!(params.blur_kernel_px, 5);
        assert_eq!(params.open_kernel_px, 3);
        assert_eq!(params.min_area_px, 8.0);
        assert_eq!(params.max_area_px, 1_000_000.0);
        assert!(params.invert_binary);
        assert_eq!(params.bin_width_microns, 25.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_coerce_odd_kernel() {
        assert_eq!(coerce_odd_kernel(0), 1);
        assert_eq!(coerce_odd_kernel(1), 1);
        assert_eq!(coerce_odd_kernel(4), 5);
        assert_eq!(coerce_odd_kernel(7), 7);

        let params = MeasurementParams {
            blur_kernel_px: 6,
            open_kernel_px: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(params.blur_kernel_px, 7);
        assert_eq!(params.open_kernel_px, 1);
    }

    #[test]
    fn test_invalid_params() {
        let inverted_band = MeasurementParams {
            min_area_px: 100.0,
            max_area_px: 50.0,
            ..Default::default()
        };
        assert!(matches!(
            inverted_band.validate(),
            Err(GrindError::InvalidParameter { .. })
        ));

        let no_bins = MeasurementParams {
            bin_width_microns: 0.0,
            ..Default::default()
        };
        assert!(no_bins.validate().is_err());

        let negative_min = MeasurementParams {
            min_area_px: -1.0,
            ..Default::default()
        };
        assert!(negative_min.validate().is_err());
    }

    #[test]
    fn test_area_band_inclusive() {
        let params = MeasurementParams::default();
        assert!(params.accepts_area(8.0));
        assert!(params.accepts_area(1_000_000.0));
        assert!(!params.accepts_area(7.9));
        assert!(!params.accepts_area(1_000_001.0));
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(Thresholds::new(0.0, 700.0).validate().is_err());
        assert!(Thresholds::new(200.0, -1.0).validate().is_err());
        assert!(Thresholds::new(800.0, 700.0).validate().is_err());
        assert!(Thresholds::new(400.0, 400.0).validate().is_ok());
    }

    #[test]
    fn test_sample_labels_trimmed() {
        let labels = SampleLabels::new(Some(" Comandante ".into()), Some("  ".into()), None);
        assert_eq!(labels.grinder.as_deref(), Some("Comandante"));
        assert!(labels.setting.is_none());
        assert!(labels.coffee_label.is_none());
    }

    #[test]
    fn test_params_serialized_names() {
        let json = serde_json::to_value(MeasurementParams::default()).unwrap();
        assert_eq!(json["blurKernelPx"], 5);
        assert_eq!(json["invertBinary"], true);
        assert_eq!(json["binWidthMicrons"], 25.0);
    }
}
