//! Error Engine: proposes a collapse target and its quadric
//! error for a candidate edge, with an optional curvature penalty.

use ahash::AHashSet;

use crate::mesh_state::{Ref, Triangle, Vertex};
use crate::numerics::Pos3;
use crate::options::SimplificationOptions;

/// `resultIndex` distinguishing which position won: endpoint 0, endpoint 1,
/// or midpoint/interior — downstream this selects how the
/// collapse executor moves vs. interpolates attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseTarget {
    Endpoint0,
    Endpoint1,
    MidpointOrInterior,
}

/// Reusable scratch for the curvature term's two triangle-id sets.
#[derive(Debug, Default)]
pub struct CurvatureScratch {
    adjacent_to_either: AHashSet<usize>,
    adjacent_to_both: AHashSet<usize>,
}

fn edge_is_border(v0: &Vertex, v1: &Vertex) -> bool {
    // The sweep only ever calls this once both endpoints already agree on
    // `border`, so this is equivalent in practice to `v0.border &&
    // v1.border`; written as `||` to read as "either side is a border".
    v0.border || v1.border
}

/// Solve for the optimal collapse position/error of edge `(i0, i1)`.
pub fn calculate_error(
    vertices: &[Vertex],
    triangles: &[Triangle],
    refs: &[Ref],
    i0: usize,
    i1: usize,
    options: &SimplificationOptions,
    curvature: &mut CurvatureScratch,
) -> (f64, Pos3, CollapseTarget) {
    let v0 = &vertices[i0];
    let v1 = &vertices[i1];
    let q = v0.q + v1.q;

    let (mut error, position, target) = if !edge_is_border(v0, v1) {
        match q.optimal_position(1e-15) {
            Some(p) => (q.vertex_error(p), p, CollapseTarget::MidpointOrInterior),
            None => fallback(&q, v0, v1),
        }
    } else {
        fallback(&q, v0, v1)
    };

    if options.preserve_surface_curvature {
        let dist = (v0.position - v1.position).norm();
        if dist > 0.0 {
            let max_dot_outer = curvature_term(vertices, triangles, refs, i0, i1, curvature);
            error += dist * max_dot_outer;
        }
    }

    (error, position, target)
}

fn fallback(
    q: &crate::numerics::SymmetricMatrix,
    v0: &Vertex,
    v1: &Vertex,
) -> (f64, Pos3, CollapseTarget) {
    let p0 = v0.position;
    let p1 = v1.position;
    let mid = nalgebra::center(&p0, &p1);

    let err_a = q.vertex_error(p0);
    let err_b = q.vertex_error(p1);
    let err_c = q.vertex_error(mid);

    // Midpoint wins ties against either endpoint.
    if err_c <= err_a && err_c <= err_b {
        (err_c, mid, CollapseTarget::MidpointOrInterior)
    } else if err_a < err_b {
        (err_a, p0, CollapseTarget::Endpoint0)
    } else {
        (err_b, p1, CollapseTarget::Endpoint1)
    }
}

/// Curvature penalty for collapsing `(i0, i1)`: the largest dot product
/// between a normal of a triangle adjacent to either endpoint and a normal
/// of a triangle adjacent to both, used to discourage collapses across
/// sharp ridges.
fn curvature_term(
    vertices: &[Vertex],
    triangles: &[Triangle],
    refs: &[Ref],
    i0: usize,
    i1: usize,
    scratch: &mut CurvatureScratch,
) -> f64 {
    scratch.adjacent_to_either.clear();
    scratch.adjacent_to_both.clear();

    let v0 = &vertices[i0];
    let mut adjacent_to_v0: AHashSet<usize> = AHashSet::with_capacity_and_hasher(v0.tcount, Default::default());
    for k in 0..v0.tcount {
        let r = refs[v0.tstart + k];
        if triangles[r.triangle_id].deleted {
            continue;
        }
        adjacent_to_v0.insert(r.triangle_id);
        scratch.adjacent_to_either.insert(r.triangle_id);
    }

    let v1 = &vertices[i1];
    for k in 0..v1.tcount {
        let r = refs[v1.tstart + k];
        if triangles[r.triangle_id].deleted {
            continue;
        }
        scratch.adjacent_to_either.insert(r.triangle_id);
        if adjacent_to_v0.contains(&r.triangle_id) {
            scratch.adjacent_to_both.insert(r.triangle_id);
        }
    }

    if scratch.adjacent_to_both.is_empty() || scratch.adjacent_to_either.is_empty() {
        return 0.0;
    }

    let mut max_dot = f64::MIN;
    for &s in &scratch.adjacent_to_either {
        for &b in &scratch.adjacent_to_both {
            let dot = triangles[s].normal.dot(&triangles[b].normal);
            if dot > max_dot {
                max_dot = dot;
            }
        }
    }
    max_dot
}
