// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process engine serving models described as JSON
//!
//! [`MemoryEngine`] implements [`GeometryEngine`] over [`ModelFixture`]s. A
//! fixture lists elements with world-space triangle geometry, their records and
//! property sets, plus loose records (materials, property set records, single
//! values, ...). The engine behaves like a real decoder towards the viewer core:
//! faces are merged into one primitive per material, placed under a root
//! container translated to the model origin, and every vertex carries its
//! element's ExpressID.

use crate::{
    Appearance, EngineError, EntityId, GeometryEngine, LoadProgress, Material, ModelId,
    ModelSource, Primitive, ProgressCallback, PropertyRecord, PropertySet, PropertySetKind,
    PropertyValue, Result, SceneGraph, SubsetGeometry, SubsetRequest,
};
use indexmap::IndexMap;
use nalgebra::Translation3;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Entity of a fixture; geometry is optional (type objects have none)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementFixture {
    pub express_id: EntityId,
    pub class_name: String,
    /// World-space positions [x, y, z, ...]
    #[serde(default)]
    pub positions: Vec<f64>,
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Elements sharing a material are merged into one primitive
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, PropertyValue>,
    #[serde(default)]
    pub property_sets: Vec<PropertySet>,
}

impl ElementFixture {
    pub fn new(express_id: u32, class_name: impl Into<String>) -> Self {
        Self {
            express_id: EntityId(express_id),
            class_name: class_name.into(),
            positions: Vec::new(),
            indices: Vec::new(),
            material: None,
            fields: IndexMap::new(),
            property_sets: Vec::new(),
        }
    }

    /// Axis-aligned box geometry (8 vertices, 12 triangles)
    pub fn with_box(mut self, min: [f64; 3], max: [f64; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        self.positions = vec![
            x0, y0, z0, x1, y0, z0, x1, y1, z0, x0, y1, z0, //
            x0, y0, z1, x1, y0, z1, x1, y1, z1, x0, y1, z1,
        ];
        self.indices = vec![
            0, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4, // front
            1, 2, 6, 1, 6, 5, // right
            2, 3, 7, 2, 7, 6, // back
            3, 0, 4, 3, 4, 7, // left
        ];
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_property_set(mut self, set: PropertySet) -> Self {
        self.property_sets.push(set);
        self
    }

    fn has_geometry(&self) -> bool {
        !self.positions.is_empty() && !self.indices.is_empty()
    }

    fn record(&self) -> PropertyRecord {
        PropertyRecord {
            express_id: self.express_id,
            class_name: self.class_name.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// JSON description of a whole model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelFixture {
    /// Translation of the model's root container
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default)]
    pub elements: Vec<ElementFixture>,
    /// Records without geometry or property sets of their own
    #[serde(default)]
    pub records: Vec<PropertyRecord>,
}

impl ModelFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_element(mut self, element: ElementFixture) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_record(mut self, record: PropertyRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Parse a fixture from JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn element(&self, id: EntityId) -> Option<&ElementFixture> {
        self.elements.iter().find(|e| e.express_id == id)
    }

    /// Build the scene graph the engine hands out for this fixture
    fn build_graph(&self, model_id: ModelId) -> SceneGraph {
        let mut graph = SceneGraph::new(model_id);
        let root = graph.root();
        let [ox, oy, oz] = self.origin;
        if let Some(node) = graph.node_mut(root) {
            node.transform = Translation3::new(ox, oy, oz).to_homogeneous();
        }

        // Group geometry by material; unnamed materials get their own primitive
        let mut groups: IndexMap<String, Vec<&ElementFixture>> = IndexMap::new();
        for element in self.elements.iter().filter(|e| e.has_geometry()) {
            let key = match &element.material {
                Some(name) => name.clone(),
                None => format!("#{}", element.express_id.0),
            };
            groups.entry(key).or_default().push(element);
        }

        for (name, elements) in groups {
            let material = graph.add_material(Material {
                name,
                color: [0.8, 0.8, 0.8, 1.0],
            });
            let mut primitive = Primitive {
                material: Some(material),
                ..Default::default()
            };
            for element in elements {
                let base = primitive.vertex_count() as u32;
                for p in element.positions.chunks_exact(3) {
                    // Vertices live in the root container's local frame
                    primitive.positions.extend_from_slice(&[p[0] - ox, p[1] - oy, p[2] - oz]);
                    primitive.element_ids.push(element.express_id.0);
                }
                primitive
                    .indices
                    .extend(element.indices.iter().map(|i| i + base));
            }
            graph.add_primitive(root, primitive);
        }

        graph
    }
}

/// A call of [`MemoryEngine`] that can be made to fail for one entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailingCall {
    ItemProperties,
    PropertySets,
}

struct OpenModel {
    fixture: Arc<ModelFixture>,
    subsets: FxHashSet<String>,
}

#[derive(Default)]
struct EngineState {
    initialized: bool,
    next_model_id: u32,
    open: FxHashMap<ModelId, OpenModel>,
    failures: FxHashSet<(FailingCall, EntityId)>,
}

/// In-process [`GeometryEngine`] over JSON model fixtures
#[derive(Default)]
pub struct MemoryEngine {
    state: RwLock<EngineState>,
    fixtures: RwLock<FxHashMap<String, Arc<ModelFixture>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `fixture` for `ModelSource::Path` sources with this file name
    pub fn register(&self, name: impl Into<String>, fixture: ModelFixture) {
        self.fixtures.write().insert(name.into(), Arc::new(fixture));
    }

    /// Make `call` fail for entity `id` in every model
    pub fn inject_failure(&self, call: FailingCall, id: EntityId) {
        self.state.write().failures.insert((call, id));
    }

    /// Number of models currently open
    pub fn open_model_count(&self) -> usize {
        self.state.read().open.len()
    }

    /// Number of live subsets across all open models
    pub fn live_subset_count(&self) -> usize {
        self.state.read().open.values().map(|m| m.subsets.len()).sum()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    fn resolve_fixture(&self, source: &ModelSource) -> Result<Arc<ModelFixture>> {
        match source {
            ModelSource::Path(path) => {
                if let Some(fixture) = self.fixtures.read().get(&source.name()) {
                    return Ok(fixture.clone());
                }
                let content = std::fs::read(path)?;
                Ok(Arc::new(ModelFixture::from_json(&content)?))
            }
            ModelSource::Bytes { data, .. } => Ok(Arc::new(ModelFixture::from_json(data)?)),
        }
    }

    fn fixture(&self, model_id: ModelId) -> Result<Arc<ModelFixture>> {
        self.state
            .read()
            .open
            .get(&model_id)
            .map(|m| m.fixture.clone())
            .ok_or(EngineError::ModelNotOpen(model_id))
    }

    fn check_failure(&self, call: FailingCall, model_id: ModelId, id: EntityId) -> Result<()> {
        if self.state.read().failures.contains(&(call, id)) {
            return Err(EngineError::other(format!(
                "{:?} failed for {} in {}",
                call, id, model_id
            )));
        }
        Ok(())
    }
}

impl GeometryEngine for MemoryEngine {
    fn initialize(&self, worker_script: &str, wasm_asset: &str) -> Result<()> {
        if worker_script.is_empty() || wasm_asset.is_empty() {
            return Err(EngineError::initialization(
                "worker script and wasm asset paths are required",
            ));
        }
        self.state.write().initialized = true;
        log::debug!("[MemoryEngine] Initialized ({}, {})", worker_script, wasm_asset);
        Ok(())
    }

    fn load_geometry(
        &self,
        source: &ModelSource,
        on_progress: ProgressCallback<'_>,
    ) -> Result<SceneGraph> {
        if !self.state.read().initialized {
            return Err(EngineError::NotInitialized);
        }

        let total = match source {
            ModelSource::Bytes { data, .. } => data.len() as u64,
            ModelSource::Path(path) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        };
        on_progress(LoadProgress::new(0, total));

        let fixture = self.resolve_fixture(source)?;
        for quarter in 1..=4u64 {
            on_progress(LoadProgress::new(total * quarter / 4, total));
        }

        let mut state = self.state.write();
        let model_id = ModelId(state.next_model_id);
        state.next_model_id += 1;
        let graph = fixture.build_graph(model_id);
        state.open.insert(
            model_id,
            OpenModel {
                fixture,
                subsets: FxHashSet::default(),
            },
        );
        log::debug!("[MemoryEngine] Opened {} from {}", model_id, source.name());
        Ok(graph)
    }

    fn item_properties(&self, model_id: ModelId, id: EntityId) -> Result<PropertyRecord> {
        let fixture = self.fixture(model_id)?;
        self.check_failure(FailingCall::ItemProperties, model_id, id)?;
        if let Some(element) = fixture.element(id) {
            return Ok(element.record());
        }
        fixture
            .records
            .iter()
            .find(|r| r.express_id == id)
            .cloned()
            .ok_or(EngineError::EntityNotFound(model_id, id))
    }

    fn property_sets(
        &self,
        model_id: ModelId,
        id: EntityId,
        include_quantities: bool,
    ) -> Result<Vec<PropertySet>> {
        let fixture = self.fixture(model_id)?;
        self.check_failure(FailingCall::PropertySets, model_id, id)?;
        let Some(element) = fixture.element(id) else {
            return Ok(Vec::new());
        };
        Ok(element
            .property_sets
            .iter()
            .filter(|s| include_quantities || s.kind == PropertySetKind::PropertySet)
            .cloned()
            .collect())
    }

    fn create_isolated_subset(&self, request: &SubsetRequest) -> Result<SubsetGeometry> {
        let fixture = self.fixture(request.model_id)?;

        let mut subset = SubsetGeometry {
            model_id: request.model_id,
            appearance_id: request.appearance.id.clone(),
            ..Default::default()
        };
        for id in &request.element_ids {
            let element = fixture
                .element(*id)
                .ok_or(EngineError::EntityNotFound(request.model_id, *id))?;
            let base = subset.vertex_count() as u32;
            subset.positions.extend_from_slice(&element.positions);
            subset
                .element_ids
                .extend(std::iter::repeat(id.0).take(element.positions.len() / 3));
            subset.indices.extend(element.indices.iter().map(|i| i + base));
        }

        let mut state = self.state.write();
        let open = state
            .open
            .get_mut(&request.model_id)
            .ok_or(EngineError::ModelNotOpen(request.model_id))?;
        if request.remove_previous {
            open.subsets.remove(&request.appearance.id);
        }
        open.subsets.insert(request.appearance.id.clone());
        Ok(subset)
    }

    fn remove_subset(&self, model_id: ModelId, appearance: &Appearance) -> Result<()> {
        let mut state = self.state.write();
        let open = state
            .open
            .get_mut(&model_id)
            .ok_or(EngineError::ModelNotOpen(model_id))?;
        open.subsets.remove(&appearance.id);
        Ok(())
    }

    fn close_model(&self, model_id: ModelId) -> Result<()> {
        self.state
            .write()
            .open
            .remove(&model_id)
            .map(|_| log::debug!("[MemoryEngine] Closed {}", model_id))
            .ok_or(EngineError::ModelNotOpen(model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn fixture() -> ModelFixture {
        ModelFixture::new()
            .with_origin([1000.0, 2000.0, 0.0])
            .with_element(
                ElementFixture::new(1, "IFCWALL")
                    .with_box([1000.0, 2000.0, 0.0], [1001.0, 2001.0, 3.0])
                    .with_material("Concrete")
                    .with_property_set(PropertySet::new(EntityId(100), "Pset_WallCommon"))
                    .with_property_set(PropertySet::quantity_set(
                        EntityId(101),
                        "Qto_WallBaseQuantities",
                    )),
            )
            .with_element(
                ElementFixture::new(2, "IFCWALL")
                    .with_box([1002.0, 2000.0, 0.0], [1003.0, 2001.0, 3.0])
                    .with_material("Concrete"),
            )
            .with_element(
                ElementFixture::new(3, "IFCSLAB").with_box([1000.0, 2000.0, -1.0], [1003.0, 2001.0, 0.0]),
            )
            .with_element(ElementFixture::new(4, "IFCWALLTYPE"))
            .with_record(PropertyRecord::new(EntityId(50), "IFCMATERIAL").with("Name", "Concrete"))
    }

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.initialize("worker.js", "web-ifc.wasm").unwrap();
        engine.register("house.json", fixture());
        engine
    }

    #[test]
    fn test_load_requires_initialize() {
        let engine = MemoryEngine::new();
        engine.register("house.json", fixture());
        let result = engine.load_geometry(&ModelSource::path("house.json"), &mut |_| {});
        assert!(matches!(result, Err(EngineError::NotInitialized)));
    }

    #[test]
    fn test_initialize_rejects_missing_assets() {
        let engine = MemoryEngine::new();
        assert!(matches!(
            engine.initialize("", "web-ifc.wasm"),
            Err(EngineError::Initialization(_))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_graph_groups_by_material() {
        let engine = engine();
        let graph = engine
            .load_geometry(&ModelSource::path("house.json"), &mut |_| {})
            .unwrap();

        // Concrete walls merged, slab alone, type object has no geometry
        assert_eq!(graph.primitives().count(), 2);
        let (_, walls) = graph.primitives().next().unwrap();
        assert_eq!(walls.element_ids(), vec![EntityId(1), EntityId(2)]);

        // Local vertices plus root translation give back world coordinates
        let bounds = graph.world_bounds();
        assert_relative_eq!(bounds.min, Point3::new(1000.0, 2000.0, -1.0));
        assert_relative_eq!(bounds.max, Point3::new(1003.0, 2001.0, 3.0));
        assert_eq!(engine.open_model_count(), 1);
    }

    #[test]
    fn test_load_reports_progress() {
        let engine = engine();
        let json = serde_json::to_vec(&fixture()).unwrap();
        let len = json.len() as u64;
        let mut events = Vec::new();
        engine
            .load_geometry(&ModelSource::bytes("drop.json", json), &mut |p| events.push(p))
            .unwrap();
        assert_eq!(events.first(), Some(&LoadProgress::new(0, len)));
        assert_eq!(events.last(), Some(&LoadProgress::new(len, len)));
    }

    #[test]
    fn test_invalid_json_fails_without_opening() {
        let engine = engine();
        let result = engine.load_geometry(&ModelSource::bytes("bad.json", b"{".to_vec()), &mut |_| {});
        assert!(matches!(result, Err(EngineError::InvalidFixture(_))));
        assert_eq!(engine.open_model_count(), 0);
    }

    #[test]
    fn test_properties_and_sets() {
        let engine = engine();
        let graph = engine
            .load_geometry(&ModelSource::path("house.json"), &mut |_| {})
            .unwrap();
        let model = graph.model_id;

        assert_eq!(engine.item_properties(model, EntityId(1)).unwrap().class_name, "IFCWALL");
        assert_eq!(engine.item_properties(model, EntityId(50)).unwrap().name(), Some("Concrete"));
        assert!(matches!(
            engine.item_properties(model, EntityId(999)),
            Err(EngineError::EntityNotFound(_, _))
        ));

        assert_eq!(engine.property_sets(model, EntityId(1), false).unwrap().len(), 1);
        assert_eq!(engine.property_sets(model, EntityId(1), true).unwrap().len(), 2);

        engine.inject_failure(FailingCall::PropertySets, EntityId(1));
        assert!(engine.property_sets(model, EntityId(1), true).is_err());
    }

    #[test]
    fn test_subsets_are_counted_and_released() {
        let engine = engine();
        let graph = engine
            .load_geometry(&ModelSource::path("house.json"), &mut |_| {})
            .unwrap();
        let request = SubsetRequest {
            model_id: graph.model_id,
            element_ids: vec![EntityId(2)],
            appearance: Appearance::default(),
            remove_previous: true,
        };

        let subset = engine.create_isolated_subset(&request).unwrap();
        assert_eq!(subset.vertex_count(), 8);
        assert_relative_eq!(subset.bounds().min, Point3::new(1002.0, 2000.0, 0.0));
        engine.create_isolated_subset(&request).unwrap();
        assert_eq!(engine.live_subset_count(), 1);

        engine.remove_subset(graph.model_id, &Appearance::default()).unwrap();
        assert_eq!(engine.live_subset_count(), 0);

        engine.close_model(graph.model_id).unwrap();
        assert_eq!(engine.open_model_count(), 0);
        assert!(matches!(
            engine.close_model(graph.model_id),
            Err(EngineError::ModelNotOpen(_))
        ));
    }
}
