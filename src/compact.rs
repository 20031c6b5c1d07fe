//! Compactor: drops deleted triangles, drops orphaned
//! vertices, and promotes any `va` attribute-index aliasing (left behind by
//! UV-seam collapses and smart-linked border merges) into real, separate
//! output vertices.

use ahash::AHashMap;

use crate::attributes::{AttributeStreams, UvChannel};
use crate::mesh_state::{MeshState, Vertex};

/// Rebuild `state`'s vertex/triangle buffers and `attrs`'s streams into
/// their final compacted form. After this call every triangle corner's `v`
/// and `va` agree, and every live vertex is referenced by at least one
/// triangle.
pub fn compact(state: &mut MeshState, attrs: &mut AttributeStreams) {
    state.drop_deleted_triangles();

    // Each distinct (geometry index, attribute index) pair used by a
    // surviving corner becomes exactly one output vertex: position comes
    // from the geometry slot, every other attribute from the alias slot.
    // A corner with `va == v` (the common case) just maps 1:1.
    let mut output_index: AHashMap<(usize, usize), usize> = AHashMap::new();
    let mut order: Vec<(usize, usize)> = Vec::new();

    for t in state.triangles.as_slice() {
        for k in 0..3 {
            let key = (t.v[k], t.va[k]);
            output_index.entry(key).or_insert_with(|| {
                let idx = order.len();
                order.push(key);
                idx
            });
        }
    }

    let mut new_vertices: Vec<Vertex> = Vec::with_capacity(order.len());
    for &(vi, _ai) in &order {
        let old = state.vertices.as_slice()[vi];
        new_vertices.push(Vertex::new(old.position, old.id));
    }

    remap_attribute_streams(attrs, &order);

    for t in state.triangles.as_mut_slice() {
        for k in 0..3 {
            let new_idx = output_index[&(t.v[k], t.va[k])];
            t.v[k] = new_idx;
            t.va[k] = new_idx;
        }
    }

    state.vertices = new_vertices.into_iter().collect();
    state.rebuild_references();
    state.invalidate_sub_mesh_offsets();
}

fn remap_attribute_streams(attrs: &mut AttributeStreams, order: &[(usize, usize)]) {
    if let Some(normals) = attrs.normals.as_mut() {
        *normals = order.iter().map(|&(_, ai)| normals.get(ai).copied().unwrap_or_default()).collect();
    }
    if let Some(tangents) = attrs.tangents.as_mut() {
        *tangents = order.iter().map(|&(_, ai)| tangents.get(ai).copied().unwrap_or_default()).collect();
    }
    if let Some(colors) = attrs.colors.as_mut() {
        *colors = order.iter().map(|&(_, ai)| colors.get(ai).copied().unwrap_or_default()).collect();
    }
    if let Some(bone_weights) = attrs.bone_weights.as_mut() {
        *bone_weights = order.iter().map(|&(_, ai)| bone_weights.get(ai).copied().unwrap_or_default()).collect();
    }
    for uv in attrs.uv.iter_mut() {
        remap_uv_channel(uv, order);
    }
    for shape in attrs.blend_shapes.iter_mut() {
        for frame in shape.frames.iter_mut() {
            frame.remap(order);
        }
    }
}

fn remap_uv_channel(uv: &mut UvChannel, order: &[(usize, usize)]) {
    match uv {
        UvChannel::None => {}
        UvChannel::Uv2(v) => *v = order.iter().map(|&(_, ai)| v.get(ai).copied().unwrap_or_default()).collect(),
        UvChannel::Uv3(v) => *v = order.iter().map(|&(_, ai)| v.get(ai).copied().unwrap_or_default()).collect(),
        UvChannel::Uv4(v) => *v = order.iter().map(|&(_, ai)| v.get(ai).copied().unwrap_or_default()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{BlendShape, BlendShapeFrame};
    use crate::numerics::Pos3;

    #[test]
    fn orphaned_vertex_is_dropped() {
        let mut state = MeshState::new();
        state.push_vertex(Pos3::new(0.0, 0.0, 0.0)); // 0
        state.push_vertex(Pos3::new(1.0, 0.0, 0.0)); // 1
        state.push_vertex(Pos3::new(0.0, 1.0, 0.0)); // 2
        state.push_vertex(Pos3::new(5.0, 5.0, 5.0)); // 3, never referenced
        state.add_sub_mesh_triangles(&[0, 1, 2]).unwrap();
        state.rebuild_references();

        let mut attrs = AttributeStreams::default();
        compact(&mut state, &mut attrs);

        assert_eq!(state.vertex_count(), 3);
    }

    #[test]
    fn seam_split_attribute_indices_become_distinct_output_vertices() {
        let mut state = MeshState::new();
        state.push_vertex(Pos3::new(0.0, 0.0, 0.0)); // 0, shared position
        state.push_vertex(Pos3::new(1.0, 0.0, 0.0)); // 1
        state.push_vertex(Pos3::new(0.0, 1.0, 0.0)); // 2
        state.push_vertex(Pos3::new(0.0, -1.0, 0.0)); // 3, the seam's alias slot
        state.add_sub_mesh_triangles(&[0, 1, 2]).unwrap();
        state.add_sub_mesh_triangles(&[0, 1, 3]).unwrap();
        state.rebuild_references();

        // Second triangle's corner 0 uses geometry vertex 0 but attribute
        // alias vertex 3 (as if a UV-seam collapse had merged position but
        // preserved the alias).
        state.triangles.as_mut_slice()[1].va[0] = 3;

        let mut attrs = AttributeStreams::default();
        attrs.set_uv(0, &[[0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.5, 0.5, 0.0, 0.0]], 4, Some(2));

        compact(&mut state, &mut attrs);

        // 5 distinct (v, va) pairs total across both triangles: (0,0),
        // (1,1), (2,2) from the first, (0,3), (1,1), (3,3) from the
        // second -> 5 unique vertices (the (1,1) pair repeats).
        assert_eq!(state.vertex_count(), 5);
    }

    #[test]
    fn blend_shape_deltas_are_remapped_alongside_other_streams() {
        let mut state = MeshState::new();
        state.push_vertex(Pos3::new(0.0, 0.0, 0.0)); // 0
        state.push_vertex(Pos3::new(1.0, 0.0, 0.0)); // 1
        state.push_vertex(Pos3::new(0.0, 1.0, 0.0)); // 2
        state.push_vertex(Pos3::new(5.0, 5.0, 5.0)); // 3, never referenced
        state.add_sub_mesh_triangles(&[0, 1, 2]).unwrap();
        state.rebuild_references();

        let mut attrs = AttributeStreams::default();
        attrs.blend_shapes.push(BlendShape {
            name: "smile".to_string(),
            frames: vec![BlendShapeFrame {
                weight: 1.0,
                delta_positions: vec![
                    crate::numerics::Vec3::new(1.0, 0.0, 0.0),
                    crate::numerics::Vec3::new(0.0, 1.0, 0.0),
                    crate::numerics::Vec3::new(0.0, 0.0, 1.0),
                    crate::numerics::Vec3::new(9.0, 9.0, 9.0), // orphan's delta, dropped
                ],
                delta_normals: vec![crate::numerics::Vec3::zeros(); 4],
                delta_tangents: vec![crate::numerics::Vec3::zeros(); 4],
            }],
        });

        compact(&mut state, &mut attrs);

        assert_eq!(state.vertex_count(), 3);
        let frame = &attrs.blend_shapes[0].frames[0];
        assert_eq!(frame.delta_positions.len(), 3);
        // Orphaned vertex 3 never appears in `order`, so its delta (9,9,9)
        // must not survive the remap.
        assert!(frame.delta_positions.iter().all(|d| *d != crate::numerics::Vec3::new(9.0, 9.0, 9.0)));
        assert_eq!(frame.delta_positions[0], crate::numerics::Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(frame.delta_positions[1], crate::numerics::Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(frame.delta_positions[2], crate::numerics::Vec3::new(0.0, 0.0, 1.0));
    }
}
