//! Distribution statistics over particle diameters
//!
//! Pure functions: no logging, no I/O. Empty inputs are valid and yield
//! zeroed results so callers can report "no particles" without an error path.

pub mod distribution;
pub mod histogram;

pub use distribution::{Classification, DistributionStats};
pub use histogram::{Histogram, HistogramBin};
