//! Particle-size distribution summary

use serde::{Deserialize, Serialize};

use crate::constants::statistics::{P10, P50, P90};
use crate::error::Result;
use crate::geometry::quantile;
use crate::measurement::Thresholds;
use crate::stats::histogram::{validate_bin_width, validate_values, Histogram};

/// Summary statistics of equivalent diameters in microns
///
/// `count == 0` marks an empty sample; every other field is then zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub mode_bin_center: f64,
    /// `(p90 - p10) / p50`
    pub span: f64,
    /// `std_dev / mean`
    pub coefficient_of_variation: f64,
}

impl DistributionStats {
    /// Summarize a list of diameters
    ///
    /// # Arguments
    ///
    /// * `values` - Diameters in microns, any order
    /// * `bin_width` - Histogram bin width in microns, used for the mode
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidParameter` for a non-empty input with a
    /// non-positive bin width or a non-finite value. Empty input is not an
    /// error and yields `DistributionStats::default()`.
    pub fn compute(values: &[f64], bin_width: f64) -> Result<Self> {
        Self::compute_with_histogram(values, bin_width).map(|(stats, _)| stats)
    }

    /// Summarize a list of diameters and keep the histogram used for the mode
    ///
    /// Sorting, validation and binning happen once. Errors are the same as
    /// for [`DistributionStats::compute`]; empty input yields zeroed
    /// statistics and a histogram without bins.
    pub fn compute_with_histogram(values: &[f64], bin_width: f64) -> Result<(Self, Histogram)> {
        if values.is_empty() {
            let histogram = Histogram {
                bin_width,
                bins: Vec::new(),
            };
            return Ok((Self::default(), histogram));
        }
        validate_bin_width(bin_width)?;
        validate_values(values)?;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let p10 = quantile(&sorted, P10)?;
        let p50 = quantile(&sorted, P50)?;
        let p90 = quantile(&sorted, P90)?;

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let histogram = Histogram::from_validated(&sorted, min, max, bin_width)?;
        let mode_bin_center = histogram.mode_bin().map_or(0.0, |bin| bin.center);

        let stats = Self {
            count: sorted.len(),
            mean,
            std_dev,
            min,
            max,
            p10,
            p50,
            p90,
            mode_bin_center,
            span: if p50 > 0.0 { (p90 - p10) / p50 } else { 0.0 },
            coefficient_of_variation: if mean > 0.0 { std_dev / mean } else { 0.0 },
        };
        Ok((stats, histogram))
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Share of particles outside the fine/coarse cut points, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Strictly below the fine threshold
    pub fine_pct: f64,
    /// Strictly above the coarse threshold
    pub coarse_pct: f64,
}

impl Classification {
    pub fn compute(values: &[f64], thresholds: &Thresholds) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let fine = values.iter().filter(|&&v| v < thresholds.fine_microns).count();
        let coarse = values.iter().filter(|&&v| v > thresholds.coarse_microns).count();

        Self {
            fine_pct: 100.0 * fine as f64 / n,
            coarse_pct: 100.0 * coarse as f64 / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrindError;

    const SAMPLE: [f64; 5] = [100.0, 150.0, 150.0, 200.0, 800.0];

    #[test]
    fn test_sample_statistics() {
        let stats = DistributionStats::compute(&SAMPLE, 25.0).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 280.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 800.0);
        assert!((stats.p10 - 120.0).abs() < 1e-9);
        assert_eq!(stats.p50, 150.0);
        assert!((stats.p90 - 560.0).abs() < 1e-9);
        assert!((stats.span - 440.0 / 150.0).abs() < 1e-9);
        assert_eq!(stats.mode_bin_center, 162.5);

        // sqrt((180² + 130² + 130² + 80² + 520²) / 5)
        let expected_std = (343_000.0f64 / 5.0).sqrt();
        assert!((stats.std_dev - expected_std).abs() < 1e-9);
        assert!((stats.coefficient_of_variation - expected_std / 280.0).abs() < 1e-12);
    }

    #[test]
    fn test_order_independent() {
        let shuffled = [800.0, 150.0, 100.0, 200.0, 150.0];
        assert_eq!(
            DistributionStats::compute(&shuffled, 25.0).unwrap(),
            DistributionStats::compute(&SAMPLE, 25.0).unwrap()
        );
    }

    #[test]
    fn test_uniform_values() {
        let stats = DistributionStats::compute(&[420.0; 7], 25.0).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
        assert_eq!(stats.p10, 420.0);
        assert_eq!(stats.p50, 420.0);
        assert_eq!(stats.p90, 420.0);
        assert_eq!(stats.span, 0.0);
    }

    #[test]
    fn test_quantiles_monotonic() {
        let values = [5.0, 900.0, 31.0, 77.0, 77.0, 410.0, 12.5, 260.0, 3.0];
        let stats = DistributionStats::compute(&values, 10.0).unwrap();
        assert!(stats.p10 <= stats.p50);
        assert!(stats.p50 <= stats.p90);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let stats = DistributionStats::compute(&[], 25.0).unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats, DistributionStats::default());
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.mode_bin_center, 0.0);
    }

    #[test]
    fn test_histogram_matches_standalone_build() {
        let (stats, histogram) = DistributionStats::compute_with_histogram(&SAMPLE, 25.0).unwrap();
        assert_eq!(stats, DistributionStats::compute(&SAMPLE, 25.0).unwrap());
        assert_eq!(histogram, Histogram::build(&SAMPLE, 25.0).unwrap());
        assert_eq!(histogram.total_count(), 5);

        let (empty, bins) = DistributionStats::compute_with_histogram(&[], 25.0).unwrap();
        assert!(empty.is_empty());
        assert!(bins.is_empty());
    }

    #[test]
    fn test_invalid_bin_width() {
        let err = DistributionStats::compute(&SAMPLE, 0.0).unwrap_err();
        assert!(matches!(err, GrindError::InvalidParameter { .. }));
    }

    #[test]
    fn test_classification() {
        let thresholds = Thresholds::new(200.0, 700.0);
        let classes = Classification::compute(&SAMPLE, &thresholds);
        assert_eq!(classes.fine_pct, 40.0);
        assert_eq!(classes.coarse_pct, 20.0);
    }

    #[test]
    fn test_classification_boundaries_exclusive() {
        let thresholds = Thresholds::new(200.0, 700.0);
        let classes = Classification::compute(&[200.0, 700.0], &thresholds);
        assert_eq!(classes.fine_pct, 0.0);
        assert_eq!(classes.coarse_pct, 0.0);
    }

    #[test]
    fn test_classification_empty() {
        let classes = Classification::compute(&[], &Thresholds::default());
        assert_eq!(classes, Classification::default());
    }
}
