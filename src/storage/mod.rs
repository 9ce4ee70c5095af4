//! Persistence of calibrations and measurements

pub mod store;

pub use store::{DeletionPolicy, DeletionReport, RecordStore};
