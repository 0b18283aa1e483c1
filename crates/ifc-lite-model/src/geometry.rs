// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene graph arena, render primitives and bounding volumes
//!
//! The engine hands back a model as a [`SceneGraph`]: an arena of tagged
//! [`SceneNode`]s. Renderable primitives carry their vertex data in f64 so that
//! georeferenced coordinates survive until the viewer core re-centres them.

use crate::{EntityId, ModelId};
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Index of a node inside its [`SceneGraph`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a material inside its [`SceneGraph`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Axis-aligned bounding box in f64 precision
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create bounds initialized to an invalid (empty) state
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Bounds of a flattened [x, y, z, ...] position buffer
    pub fn from_positions(positions: &[f64]) -> Self {
        let mut bounds = Self::empty();
        for p in positions.chunks_exact(3) {
            bounds.expand(&Point3::new(p[0], p[1], p[2]));
        }
        bounds
    }

    /// Check if bounds are valid (at least one point added)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Expand bounds to include a point
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand bounds to include another box
    pub fn union(&mut self, other: &Aabb) {
        if other.is_valid() {
            self.expand(&other.min);
            self.expand(&other.max);
        }
    }

    /// Center of the box (origin for invalid bounds)
    pub fn center(&self) -> Point3<f64> {
        if !self.is_valid() {
            return Point3::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis
    pub fn size(&self) -> Vector3<f64> {
        if !self.is_valid() {
            return Vector3::zeros();
        }
        self.max - self.min
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bounding sphere around a primitive
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere centred on the box of `positions` enclosing every vertex
    pub fn from_positions(positions: &[f64]) -> Option<Self> {
        let bounds = Aabb::from_positions(positions);
        if !bounds.is_valid() {
            return None;
        }
        let center = bounds.center();
        let radius = positions
            .chunks_exact(3)
            .map(|p| (Point3::new(p[0], p[1], p[2]) - center).norm())
            .fold(0.0, f64::max);
        Some(Self { center, radius })
    }
}

/// Add `delta` to every vertex of a flattened position buffer
pub fn translate_positions(positions: &mut [f64], delta: &Vector3<f64>) {
    for p in positions.chunks_exact_mut(3) {
        p[0] += delta.x;
        p[1] += delta.y;
        p[2] += delta.z;
    }
}

/// Apply a transform to every vertex of a flattened position buffer
pub fn transform_positions(positions: &mut [f64], transform: &Matrix4<f64>) {
    for p in positions.chunks_exact_mut(3) {
        let t = transform.transform_point(&Point3::new(p[0], p[1], p[2]));
        p[0] = t.x;
        p[1] = t.y;
        p[2] = t.z;
    }
}

/// Render material of a primitive
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// RGBA color [r, g, b, a] where values are 0.0-1.0
    pub color: [f32; 4],
}

/// Triangle mesh with a per-vertex element identifier attribute
#[derive(Clone, Debug, Default)]
pub struct Primitive {
    /// Vertex positions as flattened [x, y, z, x, y, z, ...] in f64
    pub positions: Vec<f64>,
    /// Vertex normals as flattened [nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// ExpressID of the element each vertex belongs to
    pub element_ids: Vec<u32>,
    pub material: Option<MaterialId>,
    /// Local-space bounding box, kept in sync by [`Primitive::compute_bounds`]
    pub bounds: Option<Aabb>,
    /// Local-space bounding sphere
    pub sphere: Option<BoundingSphere>,
}

impl Primitive {
    /// Check if primitive has no vertices
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recompute bounding box and sphere from the current vertex data
    pub fn compute_bounds(&mut self) {
        let bounds = Aabb::from_positions(&self.positions);
        self.bounds = bounds.is_valid().then_some(bounds);
        self.sphere = BoundingSphere::from_positions(&self.positions);
    }

    /// Distinct element ids carried by the per-vertex attribute, in first-seen order
    pub fn element_ids(&self) -> Vec<EntityId> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.element_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|id| EntityId(*id))
            .collect()
    }

    /// Vertex positions narrowed to f32 for GPU upload
    pub fn render_positions(&self) -> Vec<f32> {
        self.positions.iter().map(|v| *v as f32).collect()
    }
}

/// What a scene node is
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Grouping node (model root, storey, ...)
    Container,
    /// Renderable triangle mesh
    Mesh(Primitive),
    /// Non-geometric helper (lights, markers, ...)
    Helper,
}

/// Capability flags stored on a node instead of inspecting its identity at traversal time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub renderable: bool,
    pub pickable: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        renderable: false,
        pickable: false,
    };
    pub const MESH: Capabilities = Capabilities {
        renderable: true,
        pickable: true,
    };
}

/// Node in the scene graph arena
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Local transform relative to the parent
    pub transform: Matrix4<f64>,
    pub capabilities: Capabilities,
    pub name: Option<String>,
}

impl SceneNode {
    /// The primitive of a renderable mesh node
    pub fn primitive(&self) -> Option<&Primitive> {
        match &self.kind {
            NodeKind::Mesh(p) if self.capabilities.renderable => Some(p),
            _ => None,
        }
    }
}

/// Object graph of one loaded model
#[derive(Clone, Debug)]
pub struct SceneGraph {
    pub model_id: ModelId,
    nodes: Vec<SceneNode>,
    materials: Vec<Material>,
}

impl SceneGraph {
    /// Create a graph holding only its root container
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            nodes: vec![SceneNode {
                kind: NodeKind::Container,
                parent: None,
                transform: Matrix4::identity(),
                capabilities: Capabilities::NONE,
                name: Some("model".to_string()),
            }],
            materials: Vec::new(),
        }
    }

    /// The model's root container
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Add a node under `parent`
    pub fn add_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        transform: Matrix4<f64>,
        capabilities: Capabilities,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            kind,
            parent: Some(parent),
            transform,
            capabilities,
            name: None,
        });
        id
    }

    /// Add a renderable, pickable mesh under `parent` with identity transform
    pub fn add_primitive(&mut self, parent: NodeId, mut primitive: Primitive) -> NodeId {
        primitive.compute_bounds();
        self.add_node(
            parent,
            NodeKind::Mesh(primitive),
            Matrix4::identity(),
            Capabilities::MESH,
        )
    }

    /// Register a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    /// Iterate all nodes with their ids
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Renderable primitives with their node ids
    pub fn primitives(&self) -> impl Iterator<Item = (NodeId, &Primitive)> {
        self.nodes().filter_map(|(id, n)| n.primitive().map(|p| (id, p)))
    }

    /// Ids of all renderable mesh nodes
    pub fn primitive_ids(&self) -> Vec<NodeId> {
        self.primitives().map(|(id, _)| id).collect()
    }

    /// Mutable access to a renderable primitive
    pub fn primitive_mut(&mut self, id: NodeId) -> Option<&mut Primitive> {
        let node = self.nodes.get_mut(id.0)?;
        match &mut node.kind {
            NodeKind::Mesh(p) if node.capabilities.renderable => Some(p),
            _ => None,
        }
    }

    /// Product of the local transforms from the root down to `id`
    pub fn world_transform(&self, id: NodeId) -> Matrix4<f64> {
        let mut transform = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else { break };
            transform = node.transform * transform;
            current = node.parent;
        }
        transform
    }

    /// Union of all renderable primitives' bounds in world space
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for (id, primitive) in self.primitives() {
            let world = self.world_transform(id);
            for p in primitive.positions.chunks_exact(3) {
                bounds.expand(&world.transform_point(&Point3::new(p[0], p[1], p[2])));
            }
        }
        bounds
    }
}

/// Display settings of an isolated sub-geometry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Identifies the subset slot inside the engine (one live subset per id and model)
    pub id: String,
    /// RGB color, 0.0-1.0
    pub color: [f32; 3],
    pub opacity: f32,
    /// Whether the subset is occluded by the base geometry
    pub depth_test: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            id: "highlight".to_string(),
            color: [1.0, 0.55, 0.0],
            opacity: 0.6,
            depth_test: false,
        }
    }
}

/// Request to build a sub-geometry holding only the given elements' faces
#[derive(Clone, Debug, PartialEq)]
pub struct SubsetRequest {
    pub model_id: ModelId,
    pub element_ids: Vec<EntityId>,
    pub appearance: Appearance,
    /// Replace a previous subset with the same appearance id
    pub remove_previous: bool,
}

/// Isolated sub-geometry, in the engine's original (unshifted) coordinate frame
#[derive(Clone, Debug, Default)]
pub struct SubsetGeometry {
    pub model_id: ModelId,
    pub appearance_id: String,
    pub positions: Vec<f64>,
    pub indices: Vec<u32>,
    pub element_ids: Vec<u32>,
}

impl SubsetGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_positions(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    fn triangle(offset: f64, id: u32) -> Primitive {
        Primitive {
            positions: vec![
                offset,
                0.0,
                0.0,
                offset + 1.0,
                0.0,
                0.0,
                offset,
                1.0,
                0.0,
            ],
            indices: vec![0, 1, 2],
            element_ids: vec![id; 3],
            ..Default::default()
        }
    }

    #[test]
    fn test_aabb_expand_and_center() {
        let bounds = Aabb::from_positions(&[0.0, 0.0, 0.0, 2.0, 4.0, 6.0]);
        assert!(bounds.is_valid());
        assert_relative_eq!(bounds.center(), Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(bounds.size(), Vector3::new(2.0, 4.0, 6.0));
        assert!(!Aabb::empty().is_valid());
        assert_eq!(Aabb::empty().center(), Point3::origin());
    }

    #[test]
    fn test_sphere_encloses_vertices() {
        let positions = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let sphere = BoundingSphere::from_positions(&positions).unwrap();
        assert_relative_eq!(sphere.center, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(sphere.radius, 1.0);
        assert!(BoundingSphere::from_positions(&[]).is_none());
    }

    #[test]
    fn test_world_transform_chain() {
        let mut graph = SceneGraph::new(ModelId(0));
        let root = graph.root();
        if let Some(node) = graph.node_mut(root) {
            node.transform = Translation3::new(100.0, 0.0, 0.0).to_homogeneous();
        }
        let group = graph.add_node(
            root,
            NodeKind::Container,
            Translation3::new(0.0, 10.0, 0.0).to_homogeneous(),
            Capabilities::NONE,
        );
        let mesh = graph.add_primitive(group, triangle(0.0, 1));

        let world = graph.world_transform(mesh);
        let p = world.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(100.0, 10.0, 0.0));

        let bounds = graph.world_bounds();
        assert_relative_eq!(bounds.min, Point3::new(100.0, 10.0, 0.0));
        assert_relative_eq!(bounds.max, Point3::new(101.0, 11.0, 0.0));
    }

    #[test]
    fn test_primitives_skip_non_renderable() {
        let mut graph = SceneGraph::new(ModelId(0));
        let root = graph.root();
        graph.add_primitive(root, triangle(0.0, 1));
        graph.add_node(
            root,
            NodeKind::Mesh(triangle(5.0, 2)),
            Matrix4::identity(),
            Capabilities::NONE,
        );
        graph.add_node(root, NodeKind::Helper, Matrix4::identity(), Capabilities::NONE);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.primitives().count(), 1);
    }

    #[test]
    fn test_primitive_element_ids_are_distinct() {
        let mut p = triangle(0.0, 7);
        p.element_ids = vec![7, 7, 8];
        assert_eq!(p.element_ids(), vec![EntityId(7), EntityId(8)]);
    }

    #[test]
    fn test_translate_positions() {
        let mut positions = vec![10.0, 20.0, 30.0];
        translate_positions(&mut positions, &Vector3::new(-10.0, -20.0, -30.0));
        assert_eq!(positions, vec![0.0, 0.0, 0.0]);
    }
}
