//! Error taxonomy for the processing engine.
//!
//! Parameter and shape problems are reported before any session state is
//! touched, so every variant is terminal for the single request that raised it.

use thiserror::Error;

use crate::session::SessionId;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by filters, sessions and the request layer
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or out-of-range operation parameter
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Unknown session id
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// Undo requested with nothing on the history stack
    #[error("Nothing to undo for session {0}")]
    EmptyHistory(SessionId),

    /// Two images that must share a shape do not
    #[error("Mismatched dimensions: {left:?} vs {right:?} (height, width, channels)")]
    MismatchedDimensions {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    /// Raw pixel buffer could not be turned into an image
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// Configuration loading or parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// True for failures caused by the caller's input rather than engine state.
    ///
    /// Decode failures at the codec boundary are surfaced as validation-class
    /// failures, as are hybrid shape mismatches.
    pub fn is_validation_class(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::Decode(_)
                | EngineError::MismatchedDimensions { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_class() {
        assert!(EngineError::validation("bad").is_validation_class());
        assert!(EngineError::Decode("truncated".into()).is_validation_class());
        assert!(EngineError::MismatchedDimensions {
            left: (1, 1, 1),
            right: (2, 2, 1)
        }
        .is_validation_class());
        assert!(!EngineError::Config("x".into()).is_validation_class());
    }

    #[test]
    fn test_display_messages() {
        let err = EngineError::validation("kernel_size must be odd");
        assert_eq!(err.to_string(), "Invalid parameter: kernel_size must be odd");
    }
}
