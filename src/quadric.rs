//! Quadric Builder: plane quadrics accumulated per vertex, and
//! the initial per-edge error seeding. Only ever invoked at iteration 0 of
//! a `simplify_*` call — later iterations reuse accumulated quadrics.

use crate::error_metric::{calculate_error, CurvatureScratch};
use crate::mesh_state::MeshState;
use crate::numerics::{safe_normalize, SymmetricMatrix};
use crate::options::SimplificationOptions;

pub fn build_quadrics(state: &mut MeshState, options: &SimplificationOptions, curvature: &mut CurvatureScratch) {
    for v in state.vertices.as_mut_slice() {
        v.q = SymmetricMatrix::zero();
    }

    let triangle_count = state.triangles.len();
    for ti in 0..triangle_count {
        let deleted = state.triangles[ti].deleted;
        if deleted {
            continue;
        }
        let v = state.triangles[ti].v;
        let p0 = state.vertices[v[0]].position;
        let p1 = state.vertices[v[1]].position;
        let p2 = state.vertices[v[2]].position;
        let normal = safe_normalize((p1 - p0).cross(&(p2 - p0)));
        state.triangles[ti].normal = normal;

        let d = -normal.dot(&p0.coords);
        let plane_q = SymmetricMatrix::from_plane(normal.x, normal.y, normal.z, d);
        for &vi in &v {
            state.vertices[vi].q += plane_q;
        }
    }

    let mut new_errs = vec![[0.0_f64; 4]; triangle_count];
    for ti in 0..triangle_count {
        if state.triangles[ti].deleted {
            continue;
        }
        let v = state.triangles[ti].v;
        let mut e = [0.0_f64; 4];
        for j in 0..3 {
            let i0 = v[j];
            let i1 = v[(j + 1) % 3];
            let (err, _, _) = calculate_error(
                state.vertices.as_slice(),
                state.triangles.as_slice(),
                state.refs.as_slice(),
                i0,
                i1,
                options,
                curvature,
            );
            e[j] = err;
        }
        e[3] = e[0].min(e[1]).min(e[2]);
        new_errs[ti] = e;
    }
    for (ti, e) in new_errs.into_iter().enumerate() {
        state.triangles.as_mut_slice()[ti].err = e;
    }
}
