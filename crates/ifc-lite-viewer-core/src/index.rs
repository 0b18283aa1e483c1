// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element index
//!
//! Maps `(modelID, expressID)` to the primitives that render the element. Built
//! in one pass over the renderable primitives when a model is loaded and never
//! updated afterwards; a new load builds a new index.

use ifc_lite_model::{ElementKey, EntityId, ModelId, NodeId, SceneGraph};
use indexmap::IndexMap;

/// Where an element lives in the scene graph
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementEntry {
    pub key: ElementKey,
    /// Renderable primitives carrying vertices of this element, in graph order
    pub primitives: Vec<NodeId>,
    /// Parent container of the first primitive
    pub container: Option<NodeId>,
}

impl ElementEntry {
    /// The first primitive the element was found in
    pub fn primitive(&self) -> Option<NodeId> {
        self.primitives.first().copied()
    }
}

/// Lookup from element key to [`ElementEntry`], in first-seen order
#[derive(Clone, Debug)]
pub struct ElementIndex {
    model_id: ModelId,
    entries: IndexMap<EntityId, ElementEntry>,
}

impl ElementIndex {
    /// Index every renderable primitive of `graph` by its per-vertex element ids
    pub fn build(graph: &SceneGraph) -> Self {
        let model_id = graph.model_id;
        let mut entries: IndexMap<EntityId, ElementEntry> = IndexMap::new();

        for (node_id, primitive) in graph.primitives() {
            let container = graph.node(node_id).and_then(|n| n.parent);
            for express_id in primitive.element_ids() {
                let entry = entries.entry(express_id).or_insert_with(|| ElementEntry {
                    key: ElementKey::new(model_id, express_id),
                    primitives: Vec::new(),
                    container,
                });
                entry.primitives.push(node_id);
            }
        }

        log::debug!("[Index] {} elements indexed for {}", entries.len(), model_id);
        Self { model_id, entries }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn get(&self, key: ElementKey) -> Option<&ElementEntry> {
        if key.model_id != self.model_id {
            return None;
        }
        self.entries.get(&key.express_id)
    }

    pub fn contains(&self, key: ElementKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Element keys in index order
    pub fn keys(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.entries.values().map(|e| e.key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ElementEntry> {
        self.entries.values()
    }
}
