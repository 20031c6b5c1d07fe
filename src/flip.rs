//! Flip Detector: rejects a proposed collapse target if it
//! would invert or near-collapse a surviving triangle's normal.

use crate::mesh_state::MeshState;
use crate::numerics::{safe_normalize, Pos3};

/// Test whether collapsing vertex `i0` (and its twin `i1`, merged away) to
/// `target` flips any triangle still incident to `i0` after the collapse.
/// Triangles that straddle both `i0` and `i1` are the ones the collapse
/// deletes outright — marked in `deleted_flags` rather than tested for a
/// flip.
pub fn is_flipped(state: &MeshState, target: Pos3, i0: usize, i1: usize, deleted_flags: &mut [bool]) -> bool {
    let (tstart, tcount) = {
        let v = &state.vertices.as_slice()[i0];
        (v.tstart, v.tcount)
    };
    debug_assert_eq!(deleted_flags.len(), tcount);

    for k in 0..tcount {
        let r = state.refs.as_slice()[tstart + k];
        let t = &state.triangles.as_slice()[r.triangle_id];
        if t.deleted {
            continue;
        }
        let s = r.corner as usize;
        let id1 = t.v[(s + 1) % 3];
        let id2 = t.v[(s + 2) % 3];

        if id1 == i1 || id2 == i1 {
            deleted_flags[k] = true;
            continue;
        }

        let p1 = state.vertices.as_slice()[id1].position;
        let p2 = state.vertices.as_slice()[id2].position;
        let d1 = safe_normalize(p1 - target);
        let d2 = safe_normalize(p2 - target);

        if d1.dot(&d2).abs() > 0.999 {
            return true;
        }

        deleted_flags[k] = false;
        let n = safe_normalize(d1.cross(&d2));
        if n.dot(&t.normal) < 0.2 {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::Vec3;

    fn quad() -> MeshState {
        let mut state = MeshState::new();
        state.push_vertex(Pos3::new(0.0, 0.0, 0.0)); // 0
        state.push_vertex(Pos3::new(1.0, 0.0, 0.0)); // 1
        state.push_vertex(Pos3::new(1.0, 1.0, 0.0)); // 2
        state.push_vertex(Pos3::new(0.0, 1.0, 0.0)); // 3
        state.add_sub_mesh_triangles(&[0, 1, 2, 0, 2, 3]).unwrap();
        state.rebuild_references();
        for t in state.triangles.as_mut_slice() {
            t.normal = Vec3::new(0.0, 0.0, 1.0);
        }
        state
    }

    #[test]
    fn collapsing_onto_the_opposite_corner_flips_the_remaining_wing() {
        let state = quad();
        // Collapsing vertex 0 onto vertex 2's position degenerates triangle
        // (0,1,2) to a line and should be rejected as a flip.
        let mut deleted = vec![false; state.vertices.as_slice()[0].tcount];
        let flipped = is_flipped(&state, Pos3::new(1.0, 1.0, 0.0), 0, 3, &mut deleted);
        assert!(flipped);
    }

    #[test]
    fn a_small_in_plane_nudge_does_not_flip() {
        let state = quad();
        let mut deleted = vec![false; state.vertices.as_slice()[0].tcount];
        let flipped = is_flipped(&state, Pos3::new(0.05, 0.05, 0.0), 0, 3, &mut deleted);
        assert!(!flipped);
    }
}
