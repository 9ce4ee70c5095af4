//! Particle measurement pipeline and records

pub mod orchestrator;
pub mod types;

pub use orchestrator::{
    analyze_areas, equivalent_diameter_um, record, select_calibration, Analysis, AnalysisOutcome,
    MeasurementOrchestrator,
};
pub use types::{coerce_odd_kernel, Measurement, MeasurementParams, SampleLabels, Thresholds};
