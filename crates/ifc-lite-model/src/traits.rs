// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine traits
//!
//! The geometry/property decoding engine is external to the viewer core. It is
//! consumed through two traits:
//!
//! - [`GeometryEngine`] - blocking calls, implemented by engine backends
//! - [`AsyncEngine`] - every call is one opaque asynchronous operation; this is
//!   what the viewer core awaits

use crate::{
    Appearance, EntityId, ModelId, PropertyRecord, PropertySet, Result, SceneGraph,
    SubsetGeometry, SubsetRequest,
};
use futures::channel::mpsc;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Download/decode progress of a model load
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoadProgress {
    pub bytes_loaded: u64,
    /// Total size, 0 when unknown
    pub bytes_total: u64,
}

impl LoadProgress {
    pub fn new(bytes_loaded: u64, bytes_total: u64) -> Self {
        Self {
            bytes_loaded,
            bytes_total,
        }
    }

    /// Integer percentage, clamped to 0..=100, or `None` when the total is unknown
    pub fn percent(&self) -> Option<u8> {
        if self.bytes_total == 0 {
            return None;
        }
        let pct = (self.bytes_loaded.saturating_mul(100) / self.bytes_total).min(100);
        Some(pct as u8)
    }
}

/// Where a model is loaded from
#[derive(Clone, Debug, PartialEq)]
pub enum ModelSource {
    /// File on disk
    Path(PathBuf),
    /// In-memory content (e.g. a dropped or downloaded file)
    Bytes { name: String, data: Arc<Vec<u8>> },
}

impl ModelSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ModelSource::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        ModelSource::Bytes {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    /// Display name (file name or given name)
    pub fn name(&self) -> String {
        match self {
            ModelSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ModelSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Progress callback used by blocking loads
pub type ProgressCallback<'a> = &'a mut dyn FnMut(LoadProgress);

/// Blocking geometry/property decoding engine
///
/// Implementations may use internal worker threads; every call is expected to
/// block until its terminal result is known.
pub trait GeometryEngine: Send + Sync {
    /// One-time setup; must complete before any load is attempted
    fn initialize(&self, worker_script: &str, wasm_asset: &str) -> Result<()>;

    /// Open and decode a model, reporting byte progress along the way
    fn load_geometry(&self, source: &ModelSource, on_progress: ProgressCallback<'_>)
        -> Result<SceneGraph>;

    /// Open-schema record of one entity
    fn item_properties(&self, model_id: ModelId, id: EntityId) -> Result<PropertyRecord>;

    /// Property sets attached to an entity, in engine order
    fn property_sets(
        &self,
        model_id: ModelId,
        id: EntityId,
        include_quantities: bool,
    ) -> Result<Vec<PropertySet>>;

    /// Build an isolated sub-geometry for the requested elements
    fn create_isolated_subset(&self, request: &SubsetRequest) -> Result<SubsetGeometry>;

    /// Drop the subset held under `appearance.id` (no-op if absent)
    fn remove_subset(&self, model_id: ModelId, appearance: &Appearance) -> Result<()>;

    /// Release every engine-side resource of a model
    fn close_model(&self, model_id: ModelId) -> Result<()>;
}

/// A model load in flight: zero-or-more progress events, then one terminal result
///
/// The progress stream ends when the load has finished, so draining it before
/// awaiting `result` observes every event.
pub struct LoadTask {
    pub progress: mpsc::UnboundedReceiver<LoadProgress>,
    pub result: BoxFuture<'static, Result<SceneGraph>>,
}

/// Asynchronous engine interface awaited by the viewer core
pub trait AsyncEngine: Send + Sync {
    fn initialize(&self, worker_script: String, wasm_asset: String) -> BoxFuture<'static, Result<()>>;

    fn load_geometry(&self, source: ModelSource) -> LoadTask;

    fn item_properties(&self, model_id: ModelId, id: EntityId)
        -> BoxFuture<'static, Result<PropertyRecord>>;

    fn property_sets(
        &self,
        model_id: ModelId,
        id: EntityId,
        include_quantities: bool,
    ) -> BoxFuture<'static, Result<Vec<PropertySet>>>;

    fn create_isolated_subset(&self, request: SubsetRequest)
        -> BoxFuture<'static, Result<SubsetGeometry>>;

    fn remove_subset(&self, model_id: ModelId, appearance: Appearance)
        -> BoxFuture<'static, Result<()>>;

    fn close_model(&self, model_id: ModelId) -> BoxFuture<'static, Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(LoadProgress::new(50, 200).percent(), Some(25));
        assert_eq!(LoadProgress::new(300, 200).percent(), Some(100));
        assert_eq!(LoadProgress::new(10, 0).percent(), None);
    }

    #[test]
    fn test_source_name() {
        assert_eq!(ModelSource::path("/tmp/models/house.ifc").name(), "house.ifc");
        assert_eq!(ModelSource::bytes("drop.ifc", vec![1, 2]).name(), "drop.ifc");
    }
}
