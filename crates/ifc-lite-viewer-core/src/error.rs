// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for viewer operations
//!
//! Only engine setup and model loading reject a caller's request outright.
//! Property fetch failures, per-element validation failures and skipped
//! centering degrade to partial results and are reported through `log`.

use ifc_lite_model::{ElementKey, EngineError};
use thiserror::Error;

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Errors surfaced to the presentation layer
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Engine setup failed; no load can proceed
    #[error("Engine initialization failed: {0}")]
    Initialization(#[source] EngineError),

    /// Download or decode failure; no model is live afterwards
    #[error("Error loading model: {0}")]
    Load(#[source] EngineError),

    /// Operation requires a live model
    #[error("No model loaded")]
    NoModelLoaded,

    /// The element is not part of the live model's index
    #[error("Element {0} is not indexed")]
    ElementNotIndexed(ElementKey),

    /// The engine could not build the highlight sub-geometry
    #[error("Highlight failed: {0}")]
    Highlight(#[source] EngineError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ViewerError::Config(msg.into())
    }

    /// Whether the caller's request was rejected by a fatal engine failure
    pub fn is_fatal(&self) -> bool {
        matches!(self, ViewerError::Initialization(_) | ViewerError::Load(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_message() {
        let err = ViewerError::Load(EngineError::load("connection reset"));
        assert_eq!(
            err.to_string(),
            "Error loading model: Failed to load model: connection reset"
        );
        assert!(err.is_fatal());
        assert!(!ViewerError::NoModelLoaded.is_fatal());
    }
}
