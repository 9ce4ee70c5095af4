//! Fixed-width histogram over particle diameters

use serde::{Deserialize, Serialize};

use crate::constants::statistics::MAX_HISTOGRAM_BINS;
use crate::error::{GrindError, Result};

/// One histogram bin covering `[lower, upper)`
///
/// The last bin also holds the maximum value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub center: f64,
    pub count: usize,
}

/// Histogram anchored at the minimum value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Bin values into `max(1, ceil((max - min) / bin_width))` bins
    ///
    /// An empty input produces a histogram without bins.
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidParameter` if:
    /// - `bin_width` is not a positive finite number
    /// - a value is not finite
    /// - the range would need more than `MAX_HISTOGRAM_BINS` bins
    pub fn build(values: &[f64], bin_width: f64) -> Result<Self> {
        if values.is_empty() {
            return Ok(Self {
                bin_width,
                bins: Vec::new(),
            });
        }
        validate_bin_width(bin_width)?;
        validate_values(values)?;

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self::from_validated(values, min, max, bin_width)
    }

    /// Bin values already checked by `validate_values` and `validate_bin_width`
    pub(crate) fn from_validated(values: &[f64], min: f64, max: f64, bin_width: f64) -> Result<Self> {
        let bin_count = bin_count(min, max, bin_width)?;

        let mut counts = vec![0usize; bin_count];
        for &value in values {
            let index = (((value - min) / bin_width).floor() as usize).min(bin_count - 1);
            counts[index] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let lower = min + i as f64 * bin_width;
                HistogramBin {
                    lower,
                    upper: lower + bin_width,
                    center: lower + bin_width / 2.0,
                    count,
                }
            })
            .collect();

        Ok(Self { bin_width, bins })
    }

    /// Highest-count bin, leftmost on ties
    pub fn mode_bin(&self) -> Option<&HistogramBin> {
        self.bins.iter().fold(None, |best: Option<&HistogramBin>, bin| match best {
            Some(current) if current.count >= bin.count => Some(current),
            _ => Some(bin),
        })
    }

    /// Sum of all bin counts
    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

pub(crate) fn validate_bin_width(bin_width: f64) -> Result<()> {
    if !bin_width.is_finite() || bin_width <= 0.0 {
        return Err(GrindError::invalid_parameter("binWidthMicrons", bin_width));
    }
    Ok(())
}

pub(crate) fn validate_values(values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(GrindError::invalid_parameter("values", bad)),
        None => Ok(()),
    }
}

fn bin_count(min: f64, max: f64, bin_width: f64) -> Result<usize> {
    let raw = ((max - min) / bin_width).ceil();
    if !raw.is_finite() || raw > MAX_HISTOGRAM_BINS as f64 {
        return Err(GrindError::invalid_parameter(
            "binWidthMicrons",
            format!("{bin_width} (needs {raw} bins, limit {MAX_HISTOGRAM_BINS})"),
        ));
    }
    Ok((raw as usize).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_sum_to_input_length() {
        let values = [12.0, 13.5, 40.0, 41.0, 99.9, 250.0, 251.0, 600.0];
        for width in [0.5, 1.0, 7.0, 25.0, 1000.0] {
            let histogram = Histogram::build(&values, width).unwrap();
            assert_eq!(histogram.total_count(), values.len(), "width {width}");
        }
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        // Range 100 splits exactly into 4 bins; 200 must not open a fifth
        let histogram = Histogram::build(&[100.0, 120.0, 200.0], 25.0).unwrap();
        assert_eq!(histogram.bins.len(), 4);
        assert_eq!(histogram.bins[3].count, 1);
        assert_eq!(histogram.bins[3].lower, 175.0);
        assert_eq!(histogram.bins[3].upper, 200.0);
    }

    #[test]
    fn test_single_value_gets_one_bin() {
        let histogram = Histogram::build(&[300.0, 300.0], 25.0).unwrap();
        assert_eq!(histogram.bins.len(), 1);
        assert_eq!(histogram.bins[0].count, 2);
        assert_eq!(histogram.bins[0].center, 312.5);
    }

    #[test]
    fn test_mode_prefers_leftmost_tie() {
        let histogram = Histogram::build(&[0.0, 1.0, 10.0, 11.0, 20.0], 5.0).unwrap();
        let mode = histogram.mode_bin().unwrap();
        assert_eq!(mode.lower, 0.0);
        assert_eq!(mode.count, 2);
    }

    #[test]
    fn test_empty_input() {
        let histogram = Histogram::build(&[], 25.0).unwrap();
        assert!(histogram.is_empty());
        assert!(histogram.mode_bin().is_none());
    }

    #[test]
    fn test_invalid_bin_width() {
        assert!(matches!(
            Histogram::build(&[1.0], 0.0),
            Err(GrindError::InvalidParameter { .. })
        ));
        assert!(Histogram::build(&[1.0], -5.0).is_err());
        assert!(Histogram::build(&[1.0], f64::NAN).is_err());
    }

    #[test]
    fn test_bin_limit() {
        let err = Histogram::build(&[0.0, 1_000_000.0], 0.001).unwrap_err();
        assert!(matches!(err, GrindError::InvalidParameter { .. }));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(Histogram::build(&[1.0, f64::INFINITY], 1.0).is_err());
    }
}
