//! JSON-file persistence for calibrations and measurements
//!
//! Each collection is one pretty-printed JSON array, most recent record
//! first. Every write replaces the whole file; two processes writing the
//! same directory at once will lose updates.

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::calibration::Calibration;
use crate::constants::storage::{CALIBRATIONS_FILE, MEASUREMENTS_FILE};
use crate::error::{GrindError, Result};
use crate::measurement::Measurement;

/// What to do with measurements that reference a calibration being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Refuse while any measurement references the calibration
    #[default]
    Restrict,
    /// Delete the referencing measurements as well
    Cascade,
}

/// Outcome of a calibration deletion
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionReport {
    pub calibration: Calibration,
    pub removed_measurements: usize,
}

/// Directory holding the two record collections
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns `GrindError::StorageError` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            GrindError::storage(format!("Failed to create {}", dir.display()), e)
        })?;
        debug!("Opened record store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All calibrations, most recent first; unreadable data yields an empty list
    pub fn load_calibrations(&self) -> Vec<Calibration> {
        load_collection(&self.dir.join(CALIBRATIONS_FILE))
    }

    /// Replace the calibration collection
    pub fn save_calibrations(&self, calibrations: &[Calibration]) -> Result<()> {
        save_collection(&self.dir.join(CALIBRATIONS_FILE), calibrations)
    }

    /// Insert a calibration at the front of the collection
    pub fn add_calibration(&self, calibration: Calibration) -> Result<()> {
        let mut calibrations = self.load_calibrations();
        info!("Storing calibration '{}' ({})", calibration.name, calibration.id);
        calibrations.insert(0, calibration);
        self.save_calibrations(&calibrations)
    }

    /// All measurements, most recent first; unreadable data yields an empty list
    pub fn load_measurements(&self) -> Vec<Measurement> {
        load_collection(&self.dir.join(MEASUREMENTS_FILE))
    }

    /// Replace the measurement collection
    pub fn save_measurements(&self, measurements: &[Measurement]) -> Result<()> {
        save_collection(&self.dir.join(MEASUREMENTS_FILE), measurements)
    }

    /// Insert a measurement at the front of the collection
    pub fn add_measurement(&self, measurement: Measurement) -> Result<()> {
        let mut measurements = self.load_measurements();
        measurements.insert(0, measurement);
        self.save_measurements(&measurements)
    }

    /// # Errors
    ///
    /// Returns `GrindError::CalibrationNotFound` when no record has this id.
    pub fn find_calibration(&self, id: &str) -> Result<Calibration> {
        self.load_calibrations()
            .into_iter()
            .find(|calibration| calibration.id == id)
            .ok_or_else(|| GrindError::CalibrationNotFound { id: id.to_string() })
    }

    /// Remove a calibration according to `policy`
    ///
    /// # Errors
    ///
    /// Returns `GrindError` if:
    /// - no calibration has this id (`CalibrationNotFound`)
    /// - measurements still reference it under `Restrict` (`CalibrationInUse`)
    /// - a collection cannot be written (`StorageError`)
    pub fn delete_calibration(&self, id: &str, policy: DeletionPolicy) -> Result<DeletionReport> {
        let mut calibrations = self.load_calibrations();
        let position = calibrations
            .iter()
            .position(|calibration| calibration.id == id)
            .ok_or_else(|| GrindError::CalibrationNotFound { id: id.to_string() })?;

        let measurements = self.load_measurements();
        let referencing = measurements
            .iter()
            .filter(|measurement| measurement.calibration_id == id)
            .count();

        if policy == DeletionPolicy::Restrict && referencing > 0 {
            return Err(GrindError::CalibrationInUse {
                id: id.to_string(),
                count: referencing,
            });
        }

        // Calibrations are written before measurements
        let calibration = calibrations.remove(position);
        self.save_calibrations(&calibrations)?;

        if referencing > 0 {
            let kept: Vec<Measurement> = measurements
                .into_iter()
                .filter(|measurement| measurement.calibration_id != id)
                .collect();
            self.save_measurements(&kept)?;
        }
        let removed_measurements = referencing;

        info!(
            "Deleted calibration '{}' and {} measurement(s)",
            calibration.name, removed_measurements
        );

        Ok(DeletionReport {
            calibration,
            removed_measurements,
        })
    }

    /// Measurements whose calibration no longer exists
    ///
    /// Their copied `microns_per_pixel` keeps them valid; only the link to
    /// the calibration name is lost.
    pub fn orphaned_measurements(&self) -> Vec<Measurement> {
        let calibrations = self.load_calibrations();
        self.load_measurements()
            .into_iter()
            .filter(|measurement| {
                !calibrations
                    .iter()
                    .any(|calibration| calibration.id == measurement.calibration_id)
            })
            .collect()
    }
}

fn load_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist yet", path.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Could not read {}: {e}; using an empty collection", path.display());
            return Vec::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!("Malformed {}: {e}; using an empty collection", path.display());
        Vec::new()
    })
}

fn save_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| GrindError::storage("Failed to serialize records", e))?;

    // Atomic replace
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .map_err(|e| GrindError::storage(format!("Failed to write {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .map_err(|e| GrindError::storage(format!("Failed to replace {}", path.display()), e))?;

    debug!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}
