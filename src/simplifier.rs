//! Simplifier Loop and public surface: the `MeshSimplifier`
//! that owns mesh state, attribute streams, and options, and drives the
//! edge-collapse sweep to either a target triangle count or a lossless
//! fixed point.

use crate::attributes::{AttributeStreams, BoneWeight, MeshLike};
use crate::boundary::{classify_borders, smart_link};
use crate::collapse::collapse_edge;
use crate::compact::compact;
use crate::error_metric::{calculate_error, CurvatureScratch};
use crate::errors::{Result, SimplifyError};
use crate::flip::is_flipped;
use crate::mesh_state::MeshState;
use crate::attributes::Vec4;
use crate::numerics::Vec3;
use crate::options::SimplificationOptions;
use crate::quadric::build_quadrics;

/// The maximum number of sweeps a lossless run will take before giving up
/// on reaching a fixed point.
const LOSSLESS_ITERATION_CAP: u32 = 9999;
const LOSSLESS_THRESHOLD: f64 = 1e-3;
const UPDATE_MESH_CADENCE: u32 = 5;

#[derive(Debug)]
pub struct MeshSimplifier {
    state: MeshState,
    attrs: AttributeStreams,
    options: SimplificationOptions,
}

impl MeshSimplifier {
    pub fn new(options: SimplificationOptions) -> Result<Self> {
        options.validate()?;
        Ok(MeshSimplifier {
            state: MeshState::new(),
            attrs: AttributeStreams::default(),
            options,
        })
    }

    pub fn from_mesh(mesh: &MeshLike, options: SimplificationOptions) -> Result<Self> {
        let mut simplifier = MeshSimplifier::new(options)?;
        simplifier.initialize(mesh)?;
        Ok(simplifier)
    }

    /// Load geometry and attribute streams into a freshly constructed
    /// simplifier. Not meant to be called a second time on the same
    /// instance — build a new `MeshSimplifier` per input mesh.
    pub fn initialize(&mut self, mesh: &MeshLike) -> Result<()> {
        if mesh.sub_mesh_indices.is_empty() {
            return Err(SimplifyError::InvalidArgument("mesh has no sub-meshes".to_string()));
        }

        for &p in &mesh.positions {
            self.state.push_vertex(p);
        }
        let vertex_count = self.state.vertex_count();
        self.state.add_sub_mesh_triangles_multi(&mesh.sub_mesh_indices)?;

        if let Some(normals) = &mesh.normals {
            self.attrs.set_normals(normals, vertex_count);
        }
        if let Some(tangents) = &mesh.tangents {
            self.attrs.set_tangents(tangents, vertex_count);
        }
        if let Some(colors) = &mesh.colors {
            self.attrs.set_colors(colors, vertex_count);
        }
        if let Some(bone_weights) = &mesh.bone_weights {
            self.attrs.set_bone_weights(bone_weights, vertex_count);
        }
        let manual_components = self
            .options
            .manual_uv_component_count
            .then_some(self.options.uv_component_count);
        for (channel, uv) in mesh.uvs.iter().enumerate() {
            if let Some(values) = uv {
                self.attrs.set_uv(channel, values, vertex_count, manual_components);
            }
        }
        self.attrs.bindposes = mesh.bindposes.clone();
        self.attrs.blend_shapes = mesh.blend_shapes.clone();

        self.state.rebuild_references();

        // Border classification and smart-linking happen once, here, not
        // inside the decimation loop: they must take effect even when a
        // later `simplify_mesh` call performs zero collapses (e.g. quality
        // 1.0), and re-running link on every call would be wasted work on
        // an already-merged mesh.
        classify_borders(&mut self.state);
        if self.options.enable_smart_link {
            let uv0 = self.attrs.uv[0].clone();
            smart_link(&mut self.state, &uv0, &self.options);
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.state.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.state.triangle_count()
    }

    pub fn sub_mesh_count(&self) -> usize {
        self.state.sub_mesh_count()
    }

    pub fn add_sub_mesh_triangles(&mut self, indices: &[u32]) -> Result<()> {
        self.state.add_sub_mesh_triangles(indices)
    }

    /// One row per sub-mesh, each producing one sub-mesh id in order.
    pub fn add_sub_mesh_triangles_multi(&mut self, rows: &[Vec<u32>]) -> Result<()> {
        self.state.add_sub_mesh_triangles_multi(rows)
    }

    pub fn clear_sub_meshes(&mut self) {
        self.state.clear_sub_meshes();
    }

    pub fn get_sub_mesh_triangles(&mut self, sub_mesh: usize) -> Result<Vec<u32>> {
        self.state.get_sub_mesh_triangles(sub_mesh)
    }

    pub fn set_normals(&mut self, values: &[Vec3]) {
        self.attrs.set_normals(values, self.state.vertex_count());
    }

    /// A copy of the normal stream, or an empty `Vec` if none is set.
    pub fn get_normals(&self) -> Vec<Vec3> {
        self.attrs.normals.clone().unwrap_or_default()
    }

    pub fn set_tangents(&mut self, values: &[Vec4]) {
        self.attrs.set_tangents(values, self.state.vertex_count());
    }

    /// A copy of the tangent stream, or an empty `Vec` if none is set.
    pub fn get_tangents(&self) -> Vec<Vec4> {
        self.attrs.tangents.clone().unwrap_or_default()
    }

    pub fn set_colors(&mut self, values: &[Vec4]) {
        self.attrs.set_colors(values, self.state.vertex_count());
    }

    /// A copy of the color stream, or an empty `Vec` if none is set.
    pub fn get_colors(&self) -> Vec<Vec4> {
        self.attrs.colors.clone().unwrap_or_default()
    }

    pub fn set_bone_weights(&mut self, values: &[BoneWeight]) {
        self.attrs.set_bone_weights(values, self.state.vertex_count());
    }

    /// A copy of the bone weight stream, or an empty `Vec` if none is set.
    pub fn get_bone_weights(&self) -> Vec<BoneWeight> {
        self.attrs.bone_weights.clone().unwrap_or_default()
    }

    pub fn set_uv(&mut self, channel: usize, values: &[[f64; 4]]) {
        let manual_components = self
            .options
            .manual_uv_component_count
            .then_some(self.options.uv_component_count);
        self.attrs.set_uv(channel, values, self.state.vertex_count(), manual_components);
    }

    /// A copy of UV channel `channel` in its raw `[x, y, z, w]` form, or an
    /// empty `Vec` if the channel is unset or out of range.
    pub fn get_uv(&self, channel: usize) -> Vec<[f64; 4]> {
        self.attrs.uv.get(channel).and_then(|c| c.to_raw()).unwrap_or_default()
    }

    /// Decimate down to `quality` (clamped to `[0, 1]`) fraction of the
    /// current triangle count.
    pub fn simplify_mesh(&mut self, quality: f64) -> Result<()> {
        self.options.validate()?;
        let quality = quality.clamp(0.0, 1.0);
        let target_count = ((self.state.triangle_count() as f64) * quality).round() as usize;
        self.run_decimation(target_count, false);
        compact(&mut self.state, &mut self.attrs);
        Ok(())
    }

    /// Collapse every edge whose error stays under a fixed, small threshold
    /// until no further collapse is possible.
    pub fn simplify_mesh_lossless(&mut self) -> Result<()> {
        self.options.validate()?;
        self.run_decimation(0, true);
        compact(&mut self.state, &mut self.attrs);
        Ok(())
    }

    pub fn to_mesh_like(&mut self) -> MeshLike {
        let positions = self.state.vertices.as_slice().iter().map(|v| v.position).collect();
        let sub_mesh_indices = (0..self.state.sub_mesh_count())
            .map(|k| self.state.get_sub_mesh_triangles(k).unwrap_or_default())
            .collect();
        MeshLike {
            positions,
            sub_mesh_indices,
            normals: self.attrs.normals.clone(),
            tangents: self.attrs.tangents.clone(),
            colors: self.attrs.colors.clone(),
            uvs: std::array::from_fn(|c| self.attrs.uv[c].to_raw()),
            bone_weights: self.attrs.bone_weights.clone(),
            bindposes: self.attrs.bindposes.clone(),
            blend_shapes: self.attrs.blend_shapes.clone(),
        }
    }

    fn update_mesh(&mut self, iteration: u32, curvature: &mut CurvatureScratch) {
        if iteration > 0 {
            self.state.drop_deleted_triangles();
        }
        self.state.rebuild_references();
        classify_borders(&mut self.state);
        if iteration == 0 {
            build_quadrics(&mut self.state, &self.options, curvature);
        }
        for t in self.state.triangles.as_mut_slice() {
            t.dirty = false;
        }
    }

    fn run_decimation(&mut self, target_count: usize, lossless: bool) {
        let max_iterations = if lossless { LOSSLESS_ITERATION_CAP } else { self.options.max_iteration_count };
        let mut curvature = CurvatureScratch::default();

        for iteration in 0..max_iterations {
            if !lossless && self.state.triangle_count() <= target_count {
                break;
            }
            if iteration == 0 || lossless || iteration % UPDATE_MESH_CADENCE == 0 {
                self.update_mesh(iteration, &mut curvature);
            }

            let threshold = if lossless {
                LOSSLESS_THRESHOLD
            } else {
                1e-9 * (iteration as f64 + 3.0).powf(self.options.aggressiveness)
            };

            let any_collapsed = self.sweep(threshold, target_count, lossless, &mut curvature);

            if !any_collapsed && lossless {
                break;
            }
        }
    }

    /// One pass over the (fixed-length, pre-sweep) triangle buffer,
    /// attempting at most one collapse per non-dirty, non-deleted
    /// triangle. Returns whether any collapse happened.
    fn sweep(&mut self, threshold: f64, target_count: usize, lossless: bool, curvature: &mut CurvatureScratch) -> bool {
        let mut any_collapsed = false;
        let triangle_count_snapshot = self.state.triangles.len();

        for ti in 0..triangle_count_snapshot {
            if !lossless && self.state.triangle_count() <= target_count {
                break;
            }

            let (deleted, dirty, err3) = {
                let t = &self.state.triangles.as_slice()[ti];
                (t.deleted, t.dirty, t.err[3])
            };
            if deleted || dirty || err3 > threshold {
                continue;
            }

            for j in 0..3 {
                if self.try_collapse_edge(ti, j, threshold, curvature) {
                    any_collapsed = true;
                    break;
                }
            }
        }

        any_collapsed
    }

    fn try_collapse_edge(&mut self, triangle_id: usize, edge_corner: usize, threshold: f64, curvature: &mut CurvatureScratch) -> bool {
        let (err_j, i0, i1) = {
            let t = &self.state.triangles.as_slice()[triangle_id];
            (t.err[edge_corner], t.v[edge_corner], t.v[(edge_corner + 1) % 3])
        };
        if err_j > threshold {
            return false;
        }

        let (v0_border, v0_seam, v0_fold) = {
            let v = &self.state.vertices.as_slice()[i0];
            (v.border, v.uv_seam, v.uv_foldover)
        };
        let (v1_border, v1_seam, v1_fold) = {
            let v = &self.state.vertices.as_slice()[i1];
            (v.border, v.uv_seam, v.uv_foldover)
        };
        // An edge is only ever collapsed when both endpoints agree on every
        // flag; the error engine's border fallback relies on
        // this to treat `||` and `&&` identically in practice.
        if v0_border != v1_border || v0_seam != v1_seam || v0_fold != v1_fold {
            return false;
        }
        if v0_border && self.options.preserve_border_edges {
            return false;
        }
        if v0_seam && self.options.preserve_uv_seam_edges {
            return false;
        }
        if v0_fold && self.options.preserve_uv_foldover_edges {
            return false;
        }

        let (error, target, _kind) = calculate_error(
            self.state.vertices.as_slice(),
            self.state.triangles.as_slice(),
            self.state.refs.as_slice(),
            i0,
            i1,
            &self.options,
            curvature,
        );
        if error > threshold {
            return false;
        }

        let tcount_i0 = self.state.vertices.as_slice()[i0].tcount;
        let tcount_i1 = self.state.vertices.as_slice()[i1].tcount;
        let mut deleted0 = vec![false; tcount_i0];
        let mut deleted1 = vec![false; tcount_i1];
        if is_flipped(&self.state, target, i0, i1, &mut deleted0) {
            return false;
        }
        if is_flipped(&self.state, target, i1, i0, &mut deleted1) {
            return false;
        }

        let mut deleted_triangle_count = 0usize;
        collapse_edge(
            &mut self.state,
            &mut self.attrs,
            &self.options,
            triangle_id,
            edge_corner,
            target,
            &deleted0,
            &deleted1,
            &mut deleted_triangle_count,
            curvature,
        );
        true
    }
}
