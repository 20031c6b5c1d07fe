//! Derived read-only geometry over a [`MeshLike`] result — face normals,
//! edges, per-face area, total area, and bounds — memoized via
//! [`cache_access`] so repeated queries after a simplification pass don't
//! redo the `rayon` sweep.

use std::sync::{Arc, RwLock};

use cache_access::cache_access;
use rayon::prelude::*;

use crate::attributes::MeshLike;
use crate::numerics::{Pos3, Vec3};

#[derive(Default, Debug, Clone)]
struct InnerCache {
    face_normals: Option<Arc<Vec<Vec3>>>,
    edges: Option<Arc<Vec<[usize; 2]>>>,
    faces_area: Option<Arc<Vec<f64>>>,
    area: Option<Arc<f64>>,
    bounds: Option<Arc<(Pos3, Pos3)>>,
}

/// Read-only derived-geometry view over a simplification result. Not part
/// of the simplifier's hot path — built on demand by a caller that wants
/// normals, edges, or surface area without recomputing them by hand.
pub struct DerivedGeometry {
    pub vertices: Vec<Pos3>,
    pub faces: Vec<[usize; 3]>,
    _cache: RwLock<InnerCache>,
}

impl Clone for DerivedGeometry {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            faces: self.faces.clone(),
            _cache: RwLock::new(InnerCache::default()),
        }
    }
}

impl DerivedGeometry {
    pub fn new(vertices: Vec<Pos3>, faces: Vec<[usize; 3]>) -> Self {
        DerivedGeometry {
            vertices,
            faces,
            _cache: RwLock::new(InnerCache::default()),
        }
    }

    /// Flattens every sub-mesh's triangle list into one face array.
    pub fn from_mesh_like(mesh: &MeshLike) -> Self {
        let faces = mesh
            .sub_mesh_indices
            .iter()
            .flat_map(|indices| indices.chunks_exact(3))
            .map(|chunk| [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize])
            .collect();
        DerivedGeometry::new(mesh.positions.clone(), faces)
    }

    #[cache_access]
    pub fn face_normals(&self) -> Arc<Vec<Vec3>> {
        self.faces
            .par_iter()
            .map(|f| {
                let (v0, v1, v2) = (self.vertices[f[0]], self.vertices[f[1]], self.vertices[f[2]]);
                crate::numerics::safe_normalize((v1 - v0).cross(&(v2 - v0)))
            })
            .collect()
    }

    #[cache_access]
    pub fn edges(&self) -> Arc<Vec<[usize; 2]>> {
        self.faces
            .par_iter()
            .flat_map(|f| vec![[f[0], f[1]], [f[1], f[2]], [f[2], f[0]]])
            .collect()
    }

    #[cache_access]
    pub fn faces_area(&self) -> Arc<Vec<f64>> {
        self.faces
            .par_iter()
            .map(|f| crate::numerics::triangle_area(self.vertices[f[0]], self.vertices[f[1]], self.vertices[f[2]]))
            .collect()
    }

    #[cache_access]
    pub fn area(&self) -> Arc<f64> {
        self.faces_area().iter().sum()
    }

    /// Zero-copy view of the vertex positions, for handing off to a GPU
    /// upload buffer or a binary export format without a per-vertex copy
    /// (`nalgebra`'s `bytemuck` feature makes `Point3<f64>` a `Pod` type).
    pub fn positions_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    #[cache_access]
    pub fn bounds(&self) -> Arc<(Pos3, Pos3)> {
        let mut min = Pos3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Pos3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.vertices {
            min = Pos3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Pos3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        (min, max)
    }
}
