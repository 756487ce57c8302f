//! Unified error handling for the activity pipeline.
//!
//! Only the fallible edges of the crate return errors: activity ingestion and
//! configuration loading. Filtering, projection, ranking and event handling
//! are total and degrade to empty results instead.

use thiserror::Error;

/// Unified error type for activity-atlas operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input was not valid JSON, or did not have the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record could not be normalized into an activity
    #[error("Activity record {index} is invalid: {message}")]
    InvalidRecord { index: usize, message: String },

    /// Configuration values out of range
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for activity-atlas operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for converting Option to PipelineError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid record error.
    fn ok_or_invalid_record(self, index: usize, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_record(self, index: usize, message: &str) -> Result<T> {
        self.ok_or_else(|| PipelineError::InvalidRecord {
            index,
            message: message.to_string(),
        })
    }
}
