//! Result and error types for regionshot.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for regionshot operations
pub type SnapResult<T> = Result<T, SnapError>;

/// Errors that can occur while asserting a screenshot
#[derive(Debug, Error)]
pub enum SnapError {
    /// Element targeted by a region request is not visible
    #[error("Element \"{selector}\" could not be snapped because it is not visible")]
    ElementNotVisible {
        /// Selector that was requested
        selector: String,
    },

    /// Clipped capture rectangle has no area
    #[error("Capture region is empty after clipping ({width}x{height})")]
    EmptyRegion {
        /// Clipped width in pixels
        width: f64,
        /// Clipped height in pixels
        height: f64,
    },

    /// Region coordinates cannot be clipped (NaN or infinite offsets)
    #[error("Invalid capture region: {message}")]
    InvalidRegion {
        /// Error message
        message: String,
    },

    /// Comparison engine malfunctioned (not a mismatch)
    #[error("Comparison engine failed: {message}")]
    ComparisonEngine {
        /// Error message
        message: String,
    },

    /// Candidate does not match the reference image
    #[error("Screenshot \"{id}\" doesn't match reference. See diff at {}", diff_path.display())]
    Mismatch {
        /// Screenshot identifier
        id: String,
        /// Location of the rendered diff artifact
        diff_path: PathBuf,
    },

    /// An exclusion selector could not be resolved
    #[error("Exclusion \"{selector}\" could not be resolved: {message}")]
    ExclusionResolution {
        /// Selector of the exclusion
        selector: String,
        /// Error message
        message: String,
    },

    /// Browser driver collaborator failed
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Screenshot id or browser id cannot be mapped to artifact paths
    #[error("Invalid screenshot identifier: {message}")]
    InvalidIdentifier {
        /// Error message
        message: String,
    },

    /// Color string is not a hex color
    #[error("Invalid color \"{value}\": expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor {
        /// Rejected value
        value: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Image decoding, encoding or pixel operation failed
    #[error("Image processing failed: {message}")]
    Image {
        /// Error message
        message: String,
    },

    /// Reporting sink rejected an attachment
    #[error("Reporter error: {message}")]
    Reporter {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a comparison engine error
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::ComparisonEngine {
            message: message.into(),
        }
    }

    /// Create an image processing error
    #[must_use]
    pub fn image(message: impl Into<String>) -> Self {
        Self::Image {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for the expected "screenshot differs" outcome
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}
