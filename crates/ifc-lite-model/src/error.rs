// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for engine operations

use crate::{EntityId, ModelId};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors reported by a geometry/property engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// An operation was attempted before `initialize` completed
    #[error("Engine not initialized")]
    NotInitialized,

    /// Engine setup failed (worker script or wasm asset unusable)
    #[error("Engine initialization failed: {0}")]
    Initialization(String),

    /// Download or decode failure while loading a model
    #[error("Failed to load model: {0}")]
    Load(String),

    /// The model id does not refer to an open model
    #[error("Model {0} is not open")]
    ModelNotOpen(ModelId),

    /// Entity not found in an open model
    #[error("Entity {1} not found in model {0}")]
    EntityNotFound(ModelId, EntityId),

    /// A model description could not be decoded
    #[error("Invalid model fixture: {0}")]
    InvalidFixture(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker that owned a request went away before answering
    #[error("Engine worker unavailable")]
    WorkerUnavailable,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create a new load error
    pub fn load(msg: impl Into<String>) -> Self {
        EngineError::Load(msg.into())
    }

    /// Create a new initialization error
    pub fn initialization(msg: impl Into<String>) -> Self {
        EngineError::Initialization(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        EngineError::Other(msg.into())
    }
}
