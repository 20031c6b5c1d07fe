//! Collapse Executor: applies one edge collapse — moves a
//! vertex, merges quadrics, interpolates attributes, rewires incident
//! triangles, and appends fresh adjacency refs.

use crate::attributes::AttributeStreams;
use crate::error_metric::{calculate_error, CurvatureScratch};
use crate::mesh_state::{MeshState, Ref};
use crate::numerics::{safe_normalize, Pos3, Vec3};
use crate::options::SimplificationOptions;

/// Barycentric weights of `p` with respect to triangle `(p0, p1, p2)`,
/// with the denominator floored at `1e-8` to avoid singular triangles.
fn barycentric_weights(p: Pos3, p0: Pos3, p1: Pos3, p2: Pos3) -> [f64; 3] {
    let v0 = p1 - p0;
    let v1 = p2 - p0;
    let v2 = p - p0;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let raw_denom = d00 * d11 - d01 * d01;
    let denom = if raw_denom.abs() < 1e-8 {
        if raw_denom < 0.0 {
            -1e-8
        } else {
            1e-8
        }
    } else {
        raw_denom
    };

    let w1 = (d11 * d20 - d01 * d21) / denom;
    let w2 = (d00 * d21 - d01 * d20) / denom;
    let w0 = 1.0 - w1 - w2;
    [w0, w1, w2]
}

fn interpolate_attributes(attrs: &mut AttributeStreams, dest: usize, sources: [usize; 3], weights: [f64; 3]) {
    if let Some(normals) = attrs.normals.as_mut() {
        if dest < normals.len() && sources.iter().all(|&s| s < normals.len()) {
            let blended = normals[sources[0]] * weights[0]
                + normals[sources[1]] * weights[1]
                + normals[sources[2]] * weights[2];
            normals[dest] = safe_normalize(blended);
        }
    }
    if let Some(tangents) = attrs.tangents.as_mut() {
        if dest < tangents.len() && sources.iter().all(|&s| s < tangents.len()) {
            let blended = tangents[sources[0]] * weights[0]
                + tangents[sources[1]] * weights[1]
                + tangents[sources[2]] * weights[2];
            // The xyz part is renormalized; w (handedness sign) is kept as
            // the plain weighted sum.
            let xyz = safe_normalize(Vec3::new(blended.x, blended.y, blended.z));
            tangents[dest] = nalgebra::Vector4::new(xyz.x, xyz.y, xyz.z, blended.w);
        }
    }
    if let Some(colors) = attrs.colors.as_mut() {
        if dest < colors.len() && sources.iter().all(|&s| s < colors.len()) {
            colors[dest] = colors[sources[0]] * weights[0]
                + colors[sources[1]] * weights[1]
                + colors[sources[2]] * weights[2];
        }
    }
    for uv in attrs.uv.iter_mut() {
        uv.interpolate(dest, sources, weights);
    }
    attrs.interpolate_blend_shapes(dest, sources, weights);
    // Bone weights are deliberately left untouched: the source algorithm
    // never blends them at a collapse, only moves them on an
    // endpoint-wins result.
}

#[allow(clippy::too_many_arguments)]
fn retarget_incident(
    state: &mut MeshState,
    v_idx: usize,
    i0: usize,
    attribute_index_override: Option<usize>,
    deleted_flags: &[bool],
    deleted_triangle_count: &mut usize,
    options: &SimplificationOptions,
    curvature: &mut CurvatureScratch,
    appended_refs: &mut Vec<Ref>,
) {
    let (tstart, tcount) = {
        let v = &state.vertices.as_slice()[v_idx];
        (v.tstart, v.tcount)
    };

    for k in 0..tcount {
        let r = state.refs.as_slice()[tstart + k];
        let tid = r.triangle_id;
        if state.triangles.as_slice()[tid].deleted {
            continue;
        }
        if deleted_flags[k] {
            state.triangles.as_mut_slice()[tid].deleted = true;
            *deleted_triangle_count += 1;
            continue;
        }

        {
            let t = &mut state.triangles.as_mut_slice()[tid];
            t.v[r.corner as usize] = i0;
            if let Some(ia) = attribute_index_override {
                t.va[r.corner as usize] = ia;
            }
            t.dirty = true;
        }

        let v = state.triangles.as_slice()[tid].v;
        let mut e = [0.0_f64; 4];
        for j in 0..3 {
            let a = v[j];
            let b = v[(j + 1) % 3];
            let (err, _, _) = calculate_error(
                state.vertices.as_slice(),
                state.triangles.as_slice(),
                state.refs.as_slice(),
                a,
                b,
                options,
                curvature,
            );
            e[j] = err;
        }
        e[3] = e[0].min(e[1]).min(e[2]);
        state.triangles.as_mut_slice()[tid].err = e;

        appended_refs.push(r);
    }
}

/// Collapse the edge `(t.v[edge_corner], t.v[(edge_corner+1)%3])` of
/// triangle `triangle_id` onto `target`. `deleted0`/`deleted1` are the
/// Flip Detector's per-endpoint scratch flags.
#[allow(clippy::too_many_arguments)]
pub fn collapse_edge(
    state: &mut MeshState,
    attrs: &mut AttributeStreams,
    options: &SimplificationOptions,
    triangle_id: usize,
    edge_corner: usize,
    target: Pos3,
    deleted0: &[bool],
    deleted1: &[bool],
    deleted_triangle_count: &mut usize,
    curvature: &mut CurvatureScratch,
) {
    let (i0, i1, i2, ia0, ia1, ia2) = {
        let t = &state.triangles.as_slice()[triangle_id];
        let j = edge_corner;
        (
            t.v[j],
            t.v[(j + 1) % 3],
            t.v[(j + 2) % 3],
            t.va[j],
            t.va[(j + 1) % 3],
            t.va[(j + 2) % 3],
        )
    };

    let p0 = state.vertices.as_slice()[i0].position;
    let p1 = state.vertices.as_slice()[i1].position;
    let p2 = state.vertices.as_slice()[i2].position;
    let (old_tstart, old_tcount) = {
        let v0 = &state.vertices.as_slice()[i0];
        (v0.tstart, v0.tcount)
    };

    state.vertices.as_mut_slice()[i0].position = target;
    let q1 = state.vertices.as_slice()[i1].q;
    state.vertices.as_mut_slice()[i0].q += q1;

    let weights = barycentric_weights(target, p0, p1, p2);
    interpolate_attributes(attrs, ia0, [ia0, ia1, ia2], weights);

    // On a UV seam, leave the other corners' attribute-index alone so the
    // two sides of the seam stay separable through compaction.
    let attribute_index_override = if state.vertices.as_slice()[i0].uv_seam {
        None
    } else {
        Some(ia0)
    };

    let mut appended_refs = Vec::new();
    retarget_incident(
        state,
        i0,
        i0,
        attribute_index_override,
        deleted0,
        deleted_triangle_count,
        options,
        curvature,
        &mut appended_refs,
    );
    retarget_incident(
        state,
        i1,
        i0,
        attribute_index_override,
        deleted1,
        deleted_triangle_count,
        options,
        curvature,
        &mut appended_refs,
    );

    let new_tcount = appended_refs.len();
    let new_tstart = if new_tcount <= old_tcount {
        // Fits inside the old slice: copy back in place instead of growing
        // `refs`.
        for (k, r) in appended_refs.into_iter().enumerate() {
            state.refs.as_mut_slice()[old_tstart + k] = r;
        }
        old_tstart
    } else {
        let tail = state.refs.len();
        for r in appended_refs {
            state.refs.push(r);
        }
        tail
    };
    state.vertices.as_mut_slice()[i0].tstart = new_tstart;
    state.vertices.as_mut_slice()[i0].tcount = new_tcount;
}
