//! Error types for the grindscope library

use thiserror::Error;

/// Result type alias for grindscope operations
pub type Result<T> = std::result::Result<T, GrindError>;

/// Error types for calibration, measurement and storage operations
#[derive(Error, Debug)]
pub enum GrindError {
    /// Calibration points or reference distance are unusable
    #[error("Invalid calibration input: {reason}")]
    InvalidCalibrationInput { reason: String },

    /// Invalid measurement parameter or threshold
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// An operation that needs at least one value received none
    #[error("Empty input for {operation}")]
    EmptyInput { operation: String },

    /// No calibration with the requested id exists
    #[error("Calibration not found: {id}")]
    CalibrationNotFound { id: String },

    /// Calibration is still referenced by saved measurements
    #[error("Calibration {id} is referenced by {count} measurement(s)")]
    CalibrationInUse { id: String, count: usize },

    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Particle segmentation backend failed
    #[error("Segmentation failed: {message}")]
    SegmentationError { message: String },

    /// Record collections could not be written
    #[error("Storage error: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration file could not be read or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GrindError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage error with context
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StorageError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid_calibration(reason: impl Into<String>) -> Self {
        Self::InvalidCalibrationInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    #[cfg(feature = "opencv")]
    pub(crate) fn opencv(operation: &str, source: opencv::Error) -> Self {
        Self::SegmentationError {
            message: format!("{operation}: {source}"),
        }
    }

    /// Check if the operator can fix this condition by changing inputs and retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GrindError::InvalidCalibrationInput { .. }
                | GrindError::InvalidParameter { .. }
                | GrindError::EmptyInput { .. }
                | GrindError::CalibrationNotFound { .. }
                | GrindError::CalibrationInUse { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            GrindError::InvalidCalibrationInput { reason } => {
                format!("Calibration could not be computed: {reason}. Pick two distinct points and a positive distance.")
            }
            GrindError::InvalidParameter { parameter, value } => {
                format!("The value {value} is not valid for {parameter}. Please adjust it and try again.")
            }
            GrindError::CalibrationNotFound { .. } => {
                "The selected calibration no longer exists. Please choose another one.".to_string()
            }
            GrindError::CalibrationInUse { count, .. } => {
                format!(
                    "This calibration is used by {count} saved measurement(s). Delete them first or cascade the deletion."
                )
            }
            GrindError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            GrindError::SegmentationError { .. } => {
                "Particle detection failed. Try a photo with better contrast against a matte background.".to_string()
            }
            _ => "The operation failed. Please try again.".to_string(),
        }
    }
}
