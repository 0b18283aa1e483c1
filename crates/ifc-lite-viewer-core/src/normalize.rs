// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial normalization
//!
//! Georeferenced models place their geometry hundreds of kilometres from the
//! origin. Narrowed to f32 on the GPU such coordinates lose centimetres, which
//! shows up as jitter. [`normalize`] bakes every primitive's world transform into
//! its vertices, moves the model's bounding-box centre to the origin and hands
//! back that centre as the offset for later reuse (highlight reconciliation).
//!
//! A container-level translation would not help: the vertices themselves must
//! become small. Calling [`normalize`] twice on the same graph shifts it twice.

use ifc_lite_model::{transform_positions, translate_positions, NodeId, NodeKind, SceneGraph};
use nalgebra::{Matrix3, Matrix4, Translation3, Vector3};
use rustc_hash::FxHashMap;

/// Result of centering a model
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CenteringOutcome {
    /// Vertex data was shifted by `-offset`
    Centered { offset: Vector3<f64> },
    /// No renderable primitive; geometry left untouched
    Skipped,
}

impl CenteringOutcome {
    /// Translation that was removed from the geometry (zero when skipped)
    pub fn offset(&self) -> Vector3<f64> {
        match self {
            CenteringOutcome::Centered { offset } => *offset,
            CenteringOutcome::Skipped => Vector3::zeros(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CenteringOutcome::Skipped)
    }
}

/// Centre the model's geometry on the origin by rewriting vertex data
pub fn normalize(graph: &mut SceneGraph) -> CenteringOutcome {
    let bounds = graph.world_bounds();
    if !bounds.is_valid() {
        log::warn!(
            "[Normalize] {} has no renderable geometry, centering skipped",
            graph.model_id
        );
        return CenteringOutcome::Skipped;
    }

    let center = bounds.center().coords;
    let recenter = Translation3::from(-center).to_homogeneous();

    // World transforms must be read before any local transform is rewritten
    let world: FxHashMap<NodeId, Matrix4<f64>> = graph
        .nodes()
        .map(|(id, _)| (id, graph.world_transform(id)))
        .collect();

    // Containers and meshes end up at identity; helpers keep their placement
    // relative to the shifted geometry
    let target: FxHashMap<NodeId, Matrix4<f64>> = graph
        .nodes()
        .map(|(id, node)| {
            let placement = match node.kind {
                NodeKind::Container | NodeKind::Mesh(_) => Matrix4::identity(),
                _ => recenter * world[&id],
            };
            (id, placement)
        })
        .collect();

    let ids: Vec<NodeId> = world.keys().copied().collect();
    for id in ids {
        let Some(node) = graph.node_mut(id) else { continue };
        let parent = node
            .parent
            .and_then(|parent| target.get(&parent))
            .copied()
            .unwrap_or_else(Matrix4::identity);
        node.transform = local_transform(&parent, &target[&id]);

        if let NodeKind::Mesh(primitive) = &mut node.kind {
            let baked = world[&id];
            if baked != Matrix4::identity() {
                transform_positions(&mut primitive.positions, &baked);
                transform_normals(&mut primitive.normals, &baked);
            }
            translate_positions(&mut primitive.positions, &-center);
            primitive.compute_bounds();
        }
    }

    log::debug!(
        "[Normalize] {} shifted by ({:.3}, {:.3}, {:.3})",
        graph.model_id,
        center.x,
        center.y,
        center.z
    );
    CenteringOutcome::Centered { offset: center }
}

/// Local transform that places a node at `world` under a parent placed at `parent`
fn local_transform(parent: &Matrix4<f64>, world: &Matrix4<f64>) -> Matrix4<f64> {
    if *parent == Matrix4::identity() {
        return *world;
    }
    match parent.try_inverse() {
        Some(inverse) => inverse * world,
        None => *world,
    }
}

/// Rotate normals by the linear part of `transform` (inverse transpose)
fn transform_normals(normals: &mut [f32], transform: &Matrix4<f64>) {
    let linear: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    let Some(inverse) = linear.try_inverse() else { return };
    let normal_matrix = inverse.transpose();
    for n in normals.chunks_exact_mut(3) {
        let v = normal_matrix * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64);
        let v = v.try_normalize(f64::EPSILON).unwrap_or(v);
        n[0] = v.x as f32;
        n[1] = v.y as f32;
        n[2] = v.z as f32;
    }
}
