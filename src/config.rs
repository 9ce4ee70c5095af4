//! Configuration for the grindscope analysis pipeline.
//!
//! Groups the tunable segmentation parameters, the classification cut points,
//! the fallback subject distance for optical calibration and the location of
//! the record store.
//!
//! # Configuration Loading
//!
//! ```no_run
//! use grindscope::AnalysisConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = AnalysisConfig::from_json_file(Path::new("grindscope.json"))?;
//!
//! // Or use defaults
//! let config = AnalysisConfig::default();
//! # Ok::<(), grindscope::GrindError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::optics::DEFAULT_SUBJECT_DISTANCE_MM;
use crate::error::{GrindError, Result};
use crate::measurement::{MeasurementParams, Thresholds};

/// Complete analysis configuration.
///
/// Missing sections fall back to their defaults when loading, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Segmentation and binning parameters
    pub params: MeasurementParams,

    /// Fine and coarse cut points in microns
    pub thresholds: Thresholds,

    /// Camera-to-grounds distance assumed when EXIF has none, in centimeters
    pub default_subject_distance_cm: f64,

    /// Directory holding `calibrations.json` and `measurements.json`
    pub storage_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            params: MeasurementParams::default(),
            thresholds: Thresholds::default(),
            default_subject_distance_cm: DEFAULT_SUBJECT_DISTANCE_MM / 10.0,
            storage_dir: PathBuf::from("grindscope-data"),
        }
    }
}

impl AnalysisConfig {
    /// Check every section
    ///
    /// # Errors
    ///
    /// Returns `GrindError::InvalidParameter` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.thresholds.validate()?;
        if !self.default_subject_distance_cm.is_finite() || self.default_subject_distance_cm <= 0.0 {
            return Err(GrindError::invalid_parameter(
                "defaultSubjectDistanceCm",
                self.default_subject_distance_cm,
            ));
        }
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GrindError::config(format!("Failed to read {}", path.display()), e)
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            GrindError::config(format!("Failed to parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| GrindError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| {
            GrindError::config(format!("Failed to write {}", path.display()), e)
        })?;
        Ok(())
    }
}
