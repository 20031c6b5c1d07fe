//! Vertex/triangle/adjacency state — "Mesh State" in the
//! component table. Owns every buffer the decimation loop mutates.

use crate::buffers::MeshBuffer;
use crate::errors::{Result, SimplifyError};
use crate::numerics::{Pos3, SymmetricMatrix};

#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Pos3,
    pub tstart: usize,
    pub tcount: usize,
    pub q: SymmetricMatrix,
    pub border: bool,
    pub uv_seam: bool,
    pub uv_foldover: bool,
    /// Identity that survives in-place mutation within one simplify() call;
    /// compaction is the only thing that ever reassigns a vertex's slot.
    pub id: u32,
}

impl Vertex {
    pub fn new(position: Pos3, id: u32) -> Self {
        Vertex {
            position,
            tstart: 0,
            tcount: 0,
            q: SymmetricMatrix::zero(),
            border: false,
            uv_seam: false,
            uv_foldover: false,
            id,
        }
    }

    /// Invariant 4: border/uv_seam/uv_foldover are mutually exclusive.
    pub fn assert_flags_exclusive(&self) {
        debug_assert!(
            !(self.uv_seam && self.uv_foldover),
            "vertex cannot be both uv_seam and uv_foldover"
        );
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex::new(Pos3::origin(), 0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v: [usize; 3],
    /// Attribute-index alias; equals `v` until a UV-seam collapse splits it.
    pub va: [usize; 3],
    pub sub_mesh: usize,
    pub normal: crate::numerics::Vec3,
    /// Per-edge error `[err(v0,v1), err(v1,v2), err(v2,v0), min(...)]`.
    pub err: [f64; 4],
    pub deleted: bool,
    pub dirty: bool,
    pub id: u32,
}

impl Triangle {
    pub fn new(v: [usize; 3], sub_mesh: usize, id: u32) -> Self {
        Triangle {
            v,
            va: v,
            sub_mesh,
            normal: crate::numerics::Vec3::zeros(),
            err: [0.0; 4],
            deleted: false,
            dirty: false,
            id,
        }
    }

    pub fn min_error(&self) -> f64 {
        self.err[0].min(self.err[1]).min(self.err[2])
    }
}

impl Default for Triangle {
    fn default() -> Self {
        Triangle::new([0, 0, 0], 0, 0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ref {
    pub triangle_id: usize,
    pub corner: u8,
}

/// Per-sub-mesh starting triangle offset into the (sorted-by-sub-mesh)
/// triangle array, reconstructed during compaction.
#[derive(Debug, Clone, Default)]
pub struct SubMeshOffsets {
    /// `starts[k]` is the first triangle index of sub-mesh `k`;
    /// `starts[count]` is the sentinel end (total triangle count).
    pub starts: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshState {
    pub vertices: MeshBuffer<Vertex>,
    pub triangles: MeshBuffer<Triangle>,
    pub refs: MeshBuffer<Ref>,
    sub_mesh_count: usize,
    sub_mesh_offsets: Option<SubMeshOffsets>,
    next_vertex_id: u32,
    next_triangle_id: u32,
}

impl MeshState {
    pub fn new() -> Self {
        MeshState::default()
    }

    pub fn push_vertex(&mut self, position: Pos3) -> usize {
        let id = self.next_vertex_id;
        self.next_vertex_id += 1;
        self.vertices.push(Vertex::new(position, id))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.as_slice().iter().filter(|t| !t.deleted).count()
    }

    pub fn sub_mesh_count(&self) -> usize {
        self.sub_mesh_count
    }

    /// Append one fresh sub-mesh whose triangles come from a flat
    /// `(v0,v1,v2,...)` index array. Fails with `InvalidArgument` if the
    /// length isn't a multiple of 3.
    pub fn add_sub_mesh_triangles(&mut self, indices: &[u32]) -> Result<()> {
        if indices.len() % 3 != 0 {
            return Err(SimplifyError::InvalidArgument(format!(
                "index array length {} is not a multiple of 3",
                indices.len()
            )));
        }
        let sub_mesh = self.sub_mesh_count;
        self.sub_mesh_count += 1;
        for chunk in indices.chunks_exact(3) {
            let v = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
            let id = self.next_triangle_id;
            self.next_triangle_id += 1;
            self.triangles.push(Triangle::new(v, sub_mesh, id));
        }
        self.sub_mesh_offsets = None;
        Ok(())
    }

    /// One row per sub-mesh, each producing one sub-mesh id in order.
    pub fn add_sub_mesh_triangles_multi(&mut self, rows: &[Vec<u32>]) -> Result<()> {
        for row in rows {
            self.add_sub_mesh_triangles(row)?;
        }
        Ok(())
    }

    pub fn clear_sub_meshes(&mut self) {
        self.triangles.clear();
        self.refs.clear();
        self.sub_mesh_count = 0;
        self.sub_mesh_offsets = None;
        self.next_triangle_id = 0;
    }

    fn rebuild_sub_mesh_offsets(&mut self) {
        let mut starts = vec![self.triangles.len(); self.sub_mesh_count + 1];
        // triangles are stored pre-sorted-by-sub-mesh by construction
        // (each AddSubMeshTriangles call appends a contiguous run).
        let mut seen = vec![false; self.sub_mesh_count];
        for (idx, t) in self.triangles.as_slice().iter().enumerate() {
            if !seen[t.sub_mesh] {
                starts[t.sub_mesh] = idx;
                seen[t.sub_mesh] = true;
            }
        }
        // fill any never-seen (empty) sub-meshes with the next sub-mesh's start
        for k in (0..self.sub_mesh_count).rev() {
            if !seen[k] {
                starts[k] = starts[k + 1];
            }
        }
        self.sub_mesh_offsets = Some(SubMeshOffsets { starts });
    }

    /// Flattened `(v0,v1,v2,...)` index list for sub-mesh `k`.
    pub fn get_sub_mesh_triangles(&mut self, k: usize) -> Result<Vec<u32>> {
        if k >= self.sub_mesh_count {
            return Err(SimplifyError::InvalidArgument(format!(
                "sub-mesh index {} out of range (have {})",
                k, self.sub_mesh_count
            )));
        }
        if self.sub_mesh_offsets.is_none() {
            self.rebuild_sub_mesh_offsets();
        }
        let offsets = self.sub_mesh_offsets.as_ref().unwrap();
        let (start, end) = (offsets.starts[k], offsets.starts[k + 1]);
        let mut out = Vec::with_capacity((end - start) * 3);
        for t in &self.triangles.as_slice()[start..end] {
            out.push(t.v[0] as u32);
            out.push(t.v[1] as u32);
            out.push(t.v[2] as u32);
        }
        Ok(out)
    }

    pub fn invalidate_sub_mesh_offsets(&mut self) {
        self.sub_mesh_offsets = None;
    }

    /// Drop deleted triangles, compacting the triangle buffer in place
    /// (the "compact-lite" half of the per-iteration mesh refresh).
    pub fn drop_deleted_triangles(&mut self) {
        let kept: Vec<Triangle> = self
            .triangles
            .as_slice()
            .iter()
            .filter(|t| !t.deleted)
            .copied()
            .collect();
        self.triangles = kept.into_iter().collect();
        self.sub_mesh_offsets = None;
    }

    /// Rebuild `tstart`/`tcount` on every vertex and refill `refs` from the
    /// current (live) triangle set.
    pub fn rebuild_references(&mut self) {
        for v in self.vertices.as_mut_slice() {
            v.tstart = 0;
            v.tcount = 0;
        }

        for t in self.triangles.as_slice() {
            if t.deleted {
                continue;
            }
            for &vi in &t.v {
                self.vertices.as_mut_slice()[vi].tcount += 1;
            }
        }

        let mut tstart = 0usize;
        for v in self.vertices.as_mut_slice() {
            v.tstart = tstart;
            tstart += v.tcount;
            v.tcount = 0;
        }

        self.refs.resize(tstart);
        for (tid, t) in self.triangles.as_slice().iter().enumerate() {
            if t.deleted {
                continue;
            }
            for (corner, &vi) in t.v.iter().enumerate() {
                let v = &mut self.vertices.as_mut_slice()[vi];
                let idx = v.tstart + v.tcount;
                self.refs.as_mut_slice()[idx] = Ref {
                    triangle_id: tid,
                    corner: corner as u8,
                };
                v.tcount += 1;
            }
        }
    }
}
