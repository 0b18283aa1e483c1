// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model lifecycle
//!
//! [`ModelManager`] owns the single live [`Model`]. Loading a new model first
//! disposes the current one (highlight, engine resources, property cache), then
//! decodes, centres and indexes the new one. Selection, property extraction and
//! validation all go through the live model.

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::extract::{extract, PropertyBundle};
use crate::highlight::{Highlight, SelectionHighlighter};
use crate::index::ElementIndex;
use crate::normalize::{normalize, CenteringOutcome};
use crate::pool::WorkerPool;
use crate::validation::{validate, ValidationResult, ValidationRule};
use futures::StreamExt;
use ifc_lite_model::{
    AsyncEngine, ElementKey, GeometryEngine, LoadProgress, ModelId, ModelSource, SceneGraph,
};
use nalgebra::Vector3;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A loaded, centred and indexed model
pub struct Model {
    name: String,
    graph: SceneGraph,
    offset: Vector3<f64>,
    centering: CenteringOutcome,
    index: ElementIndex,
    properties: FxHashMap<ElementKey, PropertyBundle>,
}

impl Model {
    pub fn id(&self) -> ModelId {
        self.graph.model_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scene graph in the shifted (render) frame
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Translation removed from the geometry at load
    pub fn offset(&self) -> Vector3<f64> {
        self.offset
    }

    pub fn centering(&self) -> CenteringOutcome {
        self.centering
    }

    pub fn index(&self) -> &ElementIndex {
        &self.index
    }
}

/// What the presentation layer should show
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerStatus {
    Empty,
    Loading { percent: u8 },
    Ready,
    Failed(String),
}

pub struct ModelManager {
    engine: Arc<dyn AsyncEngine>,
    config: ViewerConfig,
    initialized: bool,
    model: Option<Model>,
    highlighter: SelectionHighlighter,
    status: ViewerStatus,
}

impl ModelManager {
    /// Manage models decoded by `engine`
    pub fn new(engine: Arc<dyn AsyncEngine>, config: ViewerConfig) -> Self {
        let highlighter = SelectionHighlighter::new(config.highlight.clone());
        Self {
            engine,
            config,
            initialized: false,
            model: None,
            highlighter,
            status: ViewerStatus::Empty,
        }
    }

    /// Run a blocking engine behind a [`WorkerPool`] sized by the configuration
    pub fn with_engine<E: GeometryEngine + 'static>(
        engine: Arc<E>,
        config: ViewerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::from_arc(engine, config.worker_threads)
            .map_err(ViewerError::Initialization)?;
        Ok(Self::new(Arc::new(pool), config))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn highlighted(&self) -> Option<&Highlight> {
        self.highlighter.active()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// One-time engine setup; later calls return immediately
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let result = self
            .engine
            .initialize(
                self.config.worker_script_path.clone(),
                self.config.wasm_asset_path.clone(),
            )
            .await;
        if let Err(e) = result {
            log::error!("[Loader] Engine initialization failed: {}", e);
            self.status = ViewerStatus::Failed(e.to_string());
            return Err(ViewerError::Initialization(e));
        }
        self.initialized = true;
        log::info!("[Loader] Engine ready");
        Ok(())
    }

    /// Replace the live model with one decoded from `source`
    ///
    /// The current model is disposed before the engine is asked for the new
    /// one. On failure no model is live and the status carries the error.
    pub async fn load_model<F>(&mut self, source: ModelSource, mut on_progress: F) -> Result<&Model>
    where
        F: FnMut(LoadProgress),
    {
        self.initialize().await?;
        self.dispose().await;

        let name = source.name();
        log::info!("[Loader] Loading {}", name);
        self.status = ViewerStatus::Loading { percent: 0 };

        let mut task = self.engine.load_geometry(source);
        while let Some(progress) = task.progress.next().await {
            if let Some(percent) = progress.percent() {
                self.status = ViewerStatus::Loading { percent };
            }
            on_progress(progress);
        }

        let mut graph = match task.result.await {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("[Loader] Failed to load {}: {}", name, e);
                let error = ViewerError::Load(e);
                self.status = ViewerStatus::Failed(error.to_string());
                return Err(error);
            }
        };

        let centering = normalize(&mut graph);
        let extent = centering.offset().amax();
        if extent > self.config.large_coordinate_threshold {
            log::info!(
                "[Loader] {} uses georeferenced coordinates (|{:.0}|), centered",
                name,
                extent
            );
        }
        let index = ElementIndex::build(&graph);
        log::info!(
            "[Loader] {} ready: {} primitives, {} elements",
            name,
            graph.primitives().count(),
            index.len()
        );

        self.status = ViewerStatus::Ready;
        let model = Model {
            name,
            offset: centering.offset(),
            centering,
            graph,
            index,
            properties: FxHashMap::default(),
        };
        Ok(&*self.model.insert(model))
    }

    /// Release the live model, its highlight and its engine resources
    pub async fn dispose(&mut self) {
        self.highlighter.clear(self.engine.as_ref()).await;
        if let Some(model) = self.model.take() {
            if let Err(e) = self.engine.close_model(model.id()).await {
                log::warn!("[Loader] Failed to release {}: {}", model.id(), e);
            }
            log::debug!("[Loader] Disposed {}", model.name());
        }
        self.status = ViewerStatus::Empty;
    }

    /// Property bundle of an element of the live model
    ///
    /// `None` when no model is live, the key belongs to another model or the
    /// element's base record cannot be fetched.
    pub async fn element_properties(&mut self, key: ElementKey) -> Option<PropertyBundle> {
        let model = self.model.as_mut()?;
        if key.model_id != model.id() {
            return None;
        }
        if let Some(bundle) = model.properties.get(&key) {
            return Some(bundle.clone());
        }

        let bundle = extract(self.engine.as_ref(), key).await?;
        if self.config.cache_properties {
            model.properties.insert(key, bundle.clone());
        }
        Some(bundle)
    }

    /// Highlight one indexed element, replacing any previous highlight
    pub async fn highlight_element(&mut self, key: ElementKey) -> Result<&Highlight> {
        let model = self.model.as_ref().ok_or(ViewerError::NoModelLoaded)?;
        if !model.index.contains(key) {
            return Err(ViewerError::ElementNotIndexed(key));
        }
        let offset = model.offset;
        self.highlighter
            .highlight(self.engine.as_ref(), key, &offset)
            .await
    }

    pub async fn clear_highlight(&mut self) {
        self.highlighter.clear(self.engine.as_ref()).await;
    }

    /// Validate every indexed element of the live model
    pub async fn validate_model<F>(
        &self,
        rules: &[ValidationRule],
        on_progress: F,
    ) -> Result<Vec<ValidationResult>>
    where
        F: FnMut(u8),
    {
        let model = self.model.as_ref().ok_or(ViewerError::NoModelLoaded)?;
        Ok(validate(
            self.engine.as_ref(),
            &model.index,
            rules,
            self.config.progress_step,
            on_progress,
        )
        .await)
    }
}
