//! Boundary Classifier: border-edge detection via incidence
//! counting, plus optional smart-linking of coincident border vertices
//! into UV seams or foldovers.

use ahash::AHashMap;
use itertools::Itertools;

use crate::attributes::UvChannel;
use crate::mesh_state::MeshState;
use crate::options::SimplificationOptions;

/// Flag every vertex that is an endpoint of a border edge (an edge
/// belonging to exactly one non-deleted triangle). Requires `refs` to
/// already reflect the current triangle set.
pub fn classify_borders(state: &mut MeshState) {
    for v in state.vertices.as_mut_slice() {
        v.border = false;
    }

    let vertex_count = state.vertices.len();
    for v_idx in 0..vertex_count {
        let (tstart, tcount) = {
            let v = &state.vertices.as_slice()[v_idx];
            (v.tstart, v.tcount)
        };

        let mut neighbor_counts: AHashMap<usize, usize> = AHashMap::new();
        for k in 0..tcount {
            let r = state.refs.as_slice()[tstart + k];
            let t = &state.triangles.as_slice()[r.triangle_id];
            if t.deleted {
                continue;
            }
            for j in 0..3 {
                let a = t.v[j];
                let b = t.v[(j + 1) % 3];
                if a == v_idx || b == v_idx {
                    let neighbor = if a == v_idx { b } else { a };
                    if neighbor != v_idx {
                        *neighbor_counts.entry(neighbor).or_insert(0) += 1;
                    }
                }
            }
        }

        for (neighbor, count) in neighbor_counts {
            if count == 1 {
                state.vertices.as_mut_slice()[v_idx].border = true;
                state.vertices.as_mut_slice()[neighbor].border = true;
            }
        }
    }
}

fn uv_coords_match(uv0: &UvChannel, a: usize, b: usize) -> bool {
    match (uv0.uv2_at(a), uv0.uv2_at(b)) {
        (Some(pa), Some(pb)) => (pa - pb).norm() < 1e-12,
        (None, None) => true,
        _ => false,
    }
}

/// Merge spatially-coincident border vertex pairs, classifying each pair as
/// a UV seam (attributes differ) or a UV foldover (attributes match).
/// `uv0` is UV channel 0, consulted only for the seam/foldover
/// classification. Rebuilds adjacency once at the end.
pub fn smart_link(state: &mut MeshState, uv0: &UvChannel, options: &SimplificationOptions) {
    if !options.enable_smart_link {
        return;
    }

    let border_indices: Vec<usize> = (0..state.vertices.len())
        .filter(|&i| state.vertices.as_slice()[i].border)
        .collect();
    if border_indices.len() < 2 {
        return;
    }

    let border_min_x = border_indices
        .iter()
        .map(|&i| state.vertices.as_slice()[i].position.x)
        .fold(f64::INFINITY, f64::min);
    let border_max_x = border_indices
        .iter()
        .map(|&i| state.vertices.as_slice()[i].position.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let width = (border_max_x - border_min_x).max(1e-12);

    let int32_max = i32::MAX as f64;
    let hash_of = |x: f64| -> i64 { (((x - border_min_x) / width * 2.0 - 1.0) * int32_max).floor() as i64 };

    let entries: Vec<(i64, usize)> = border_indices
        .iter()
        .map(|&i| (hash_of(state.vertices.as_slice()[i].position.x), i))
        .sorted_by_key(|e| e.0)
        .collect();

    let hash_max_distance = (((options.vertex_link_distance / width) * int32_max).floor() as i64).max(1);
    let link_dist_sq = options.vertex_link_distance * options.vertex_link_distance;

    let mut retired = vec![false; state.vertices.len()];

    for i in 0..entries.len() {
        let (hi, vi) = entries[i];
        if retired[vi] {
            continue;
        }
        for &(hj, vj) in &entries[i + 1..] {
            if hj - hi > hash_max_distance {
                break;
            }
            if retired[vj] {
                continue;
            }
            let pi = state.vertices.as_slice()[vi].position;
            let pj = state.vertices.as_slice()[vj].position;
            if (pi - pj).norm_squared() > link_dist_sq {
                continue;
            }

            state.vertices.as_mut_slice()[vi].border = false;
            state.vertices.as_mut_slice()[vj].border = false;
            if uv_coords_match(uv0, vi, vj) {
                state.vertices.as_mut_slice()[vi].uv_foldover = true;
                state.vertices.as_mut_slice()[vj].uv_foldover = true;
            } else {
                state.vertices.as_mut_slice()[vi].uv_seam = true;
                state.vertices.as_mut_slice()[vj].uv_seam = true;
            }

            // Only the geometric index moves; the attribute-index alias
            // (`va`) is left pointing at `vj` so the two sides of the seam
            // stay separable through compaction.
            for t in state.triangles.as_mut_slice() {
                if t.deleted {
                    continue;
                }
                for k in 0..3 {
                    if t.v[k] == vj {
                        t.v[k] = vi;
                    }
                }
            }
            retired[vj] = true;
        }
    }

    state.rebuild_references();
}
