// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selection highlight
//!
//! At most one element is highlighted at a time. The engine builds the
//! highlight sub-geometry from its own, unshifted coordinates, so the model's
//! centering offset is removed from it before it is handed to the renderer.

use crate::error::{Result, ViewerError};
use ifc_lite_model::{
    translate_positions, Appearance, AsyncEngine, ElementKey, SubsetGeometry, SubsetRequest,
};
use nalgebra::Vector3;

/// The live highlight, in the model's shifted frame
#[derive(Clone, Debug)]
pub struct Highlight {
    pub key: ElementKey,
    pub geometry: SubsetGeometry,
}

pub struct SelectionHighlighter {
    appearance: Appearance,
    active: Option<Highlight>,
}

impl SelectionHighlighter {
    pub fn new(appearance: Appearance) -> Self {
        Self {
            appearance,
            active: None,
        }
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn active(&self) -> Option<&Highlight> {
        self.active.as_ref()
    }

    /// Replace the current highlight with one for `key`
    ///
    /// `offset` is the centering offset of the model the element belongs to.
    pub async fn highlight(
        &mut self,
        engine: &dyn AsyncEngine,
        key: ElementKey,
        offset: &Vector3<f64>,
    ) -> Result<&Highlight> {
        self.clear(engine).await;

        let request = SubsetRequest {
            model_id: key.model_id,
            element_ids: vec![key.express_id],
            appearance: self.appearance.clone(),
            remove_previous: true,
        };
        let mut geometry = engine
            .create_isolated_subset(request)
            .await
            .map_err(ViewerError::Highlight)?;
        translate_positions(&mut geometry.positions, &-offset);

        log::debug!(
            "[Highlight] {} ({} vertices)",
            key,
            geometry.vertex_count()
        );
        Ok(&*self.active.insert(Highlight { key, geometry }))
    }

    /// Drop the current highlight; no-op when nothing is highlighted
    pub async fn clear(&mut self, engine: &dyn AsyncEngine) {
        let Some(previous) = self.active.take() else {
            return;
        };
        if let Err(e) = engine
            .remove_subset(previous.key.model_id, self.appearance.clone())
            .await
        {
            log::warn!("[Highlight] Failed to remove subset for {}: {}", previous.key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use approx::assert_relative_eq;
    use ifc_lite_model::{
        ElementFixture, EntityId, GeometryEngine, MemoryEngine, ModelFixture, ModelSource,
    };
    use std::sync::Arc;

    fn pool() -> (Arc<MemoryEngine>, WorkerPool<MemoryEngine>, ElementKey) {
        let engine = Arc::new(MemoryEngine::new());
        engine.initialize("w.js", "a.wasm").unwrap();
        engine.register(
            "box.json",
            ModelFixture::new().with_element(
                ElementFixture::new(7, "IFCCOLUMN")
                    .with_box([500.0, 500.0, 0.0], [501.0, 501.0, 3.0]),
            ),
        );
        let graph = engine
            .load_geometry(&ModelSource::path("box.json"), &mut |_| {})
            .unwrap();
        let key = ElementKey::new(graph.model_id, EntityId(7));
        let pool = WorkerPool::from_arc(engine.clone(), 1).unwrap();
        (engine, pool, key)
    }

    #[tokio::test]
    async fn test_highlight_removes_offset() {
        let (_, pool, key) = pool();
        let mut highlighter = SelectionHighlighter::new(Appearance::default());

        let offset = Vector3::new(500.5, 500.5, 1.5);
        let highlight = highlighter.highlight(&pool, key, &offset).await.unwrap();
        let bounds = highlight.geometry.bounds();
        assert_relative_eq!(bounds.center().coords, Vector3::zeros(), epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_single_live_highlight() {
        let (engine, pool, key) = pool();
        let mut highlighter = SelectionHighlighter::new(Appearance::default());

        highlighter.highlight(&pool, key, &Vector3::zeros()).await.unwrap();
        highlighter.highlight(&pool, key, &Vector3::zeros()).await.unwrap();
        assert_eq!(engine.live_subset_count(), 1);

        highlighter.clear(&pool).await;
        highlighter.clear(&pool).await;
        assert!(highlighter.active().is_none());
        assert_eq!(engine.live_subset_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_highlight_leaves_nothing_active() {
        let (_, pool, key) = pool();
        let mut highlighter = SelectionHighlighter::new(Appearance::default());
        highlighter.highlight(&pool, key, &Vector3::zeros()).await.unwrap();

        let missing = ElementKey::new(key.model_id, EntityId(999));
        let result = highlighter.highlight(&pool, missing, &Vector3::zeros()).await;
        assert!(matches!(result, Err(ViewerError::Highlight(_))));
        assert!(highlighter.active().is_none());
    }
}
