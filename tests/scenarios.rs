//! End-to-end scenarios: literal fixtures exercising the
//! whole `MeshSimplifier` pipeline rather than any one internal module.

use ahash::AHashMap;
use mesh_simplify::{BlendShape, BlendShapeFrame, MeshLike, MeshSimplifier, Pos3, SimplificationOptions, SimplifyError};

fn no_uvs() -> [Option<Vec<[f64; 4]>>; mesh_simplify::MAX_UV_CHANNELS] {
    std::array::from_fn(|_| None)
}

fn mesh_from(positions: Vec<Pos3>, indices: Vec<u32>) -> MeshLike {
    MeshLike {
        positions,
        sub_mesh_indices: vec![indices],
        normals: None,
        tangents: None,
        colors: None,
        uvs: no_uvs(),
        bone_weights: None,
        bindposes: None,
        blend_shapes: vec![],
    }
}

/// Every undirected edge of a flat `(v0,v1,v2,...)` index buffer and how
/// many triangles reference it — the watertightness check of Scenario A/D.
fn edge_incidence(indices: &[u32]) -> AHashMap<(u32, u32), u32> {
    let mut counts = AHashMap::new();
    for tri in indices.chunks_exact(3) {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = (a.min(b), a.max(b));
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

fn bounds(positions: &[Pos3]) -> (Pos3, Pos3) {
    let mut min = Pos3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Pos3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in positions {
        min = Pos3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Pos3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }
    (min, max)
}

fn unit_cube(half: f64) -> MeshLike {
    let positions = vec![
        Pos3::new(-half, -half, -half),
        Pos3::new(half, -half, -half),
        Pos3::new(half, half, -half),
        Pos3::new(-half, half, -half),
        Pos3::new(-half, -half, half),
        Pos3::new(half, -half, half),
        Pos3::new(half, half, half),
        Pos3::new(-half, half, half),
    ];
    let indices: Vec<u32> = vec![
        0, 1, 2, 0, 2, 3, // bottom (z = -half)
        4, 6, 5, 4, 7, 6, // top (z = half)
        0, 4, 5, 0, 5, 1, // front
        1, 5, 6, 1, 6, 2, // right
        2, 6, 7, 2, 7, 3, // back
        3, 7, 4, 3, 4, 0, // left
    ];
    mesh_from(positions, indices)
}

#[test]
fn scenario_a_unit_cube_quality_half() {
    let mesh = unit_cube(0.5);
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();
    let (min_before, max_before) = bounds(&mesh.positions);

    simplifier.simplify_mesh(0.5).unwrap();
    let out = simplifier.to_mesh_like();

    assert_eq!(out.sub_mesh_indices[0].len() / 3, 6);

    let incidence = edge_incidence(&out.sub_mesh_indices[0]);
    assert!(incidence.values().all(|&c| c == 2), "every edge must be shared by exactly two triangles");

    let (min_after, max_after) = bounds(&out.positions);
    assert!((min_after - min_before).norm() < 1e-9);
    assert!((max_after - max_before).norm() < 1e-9);
}

#[test]
fn scenario_b_single_triangle_quality_half() {
    let mesh = mesh_from(vec![Pos3::new(0.0, 0.0, 0.0), Pos3::new(1.0, 0.0, 0.0), Pos3::new(0.0, 1.0, 0.0)], vec![0, 1, 2]);
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();

    simplifier.simplify_mesh(0.5).unwrap();
    let out = simplifier.to_mesh_like();

    assert_eq!(out.sub_mesh_indices[0].len() / 3, 1);
    assert_eq!(out.positions.len(), 3);
}

#[test]
fn scenario_c_coplanar_strip_lossless() {
    // A 2 x 50 grid of vertices on z = 0, 98 triangles.
    let mut positions = Vec::with_capacity(100);
    for i in 0..50 {
        positions.push(Pos3::new(i as f64, 0.0, 0.0));
        positions.push(Pos3::new(i as f64, 1.0, 0.0));
    }
    let mut indices = Vec::with_capacity(98 * 3);
    for i in 0..49u32 {
        let bottom0 = i * 2;
        let top0 = i * 2 + 1;
        let bottom1 = (i + 1) * 2;
        let top1 = (i + 1) * 2 + 1;
        indices.extend_from_slice(&[bottom0, top0, top1]);
        indices.extend_from_slice(&[bottom0, top1, bottom1]);
    }
    assert_eq!(indices.len() / 3, 98);

    let mesh = mesh_from(positions, indices);
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();
    simplifier.simplify_mesh_lossless().unwrap();
    let out = simplifier.to_mesh_like();

    assert!(out.sub_mesh_indices[0].len() / 3 <= 50);
    for p in &out.positions {
        assert!(p.z.abs() <= 1e-9);
    }
}

fn push_vertex(positions: &mut Vec<Pos3>, cache: &mut AHashMap<(u64, u64, u64), u32>, p: Pos3) -> u32 {
    let key = (p.x.to_bits(), p.y.to_bits(), p.z.to_bits());
    if let Some(&idx) = cache.get(&key) {
        return idx;
    }
    let idx = positions.len() as u32;
    positions.push(p);
    cache.insert(key, idx);
    idx
}

fn icosphere(subdivisions: u32) -> (Vec<Pos3>, Vec<u32>) {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let raw = [
        (-1.0, t, 0.0), (1.0, t, 0.0), (-1.0, -t, 0.0), (1.0, -t, 0.0),
        (0.0, -1.0, t), (0.0, 1.0, t), (0.0, -1.0, -t), (0.0, 1.0, -t),
        (t, 0.0, -1.0), (t, 0.0, 1.0), (-t, 0.0, -1.0), (-t, 0.0, 1.0),
    ];
    let mut positions: Vec<Pos3> = raw
        .iter()
        .map(|&(x, y, z)| Pos3::from(nalgebra::Vector3::new(x, y, z).normalize()))
        .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut cache: AHashMap<(u64, u64, u64), u32> = AHashMap::new();
        for (idx, p) in positions.iter().enumerate() {
            cache.insert((p.x.to_bits(), p.y.to_bits(), p.z.to_bits()), idx as u32);
        }
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Pos3>| -> u32 {
            let pa = positions[a as usize];
            let pb = positions[b as usize];
            let mid = Pos3::from(nalgebra::Vector3::new((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0, (pa.z + pb.z) / 2.0).normalize());
            push_vertex(positions, &mut cache, mid)
        };

        let mut next_faces = Vec::with_capacity(faces.len() * 4);
        for f in &faces {
            let ab = midpoint(f[0], f[1], &mut positions);
            let bc = midpoint(f[1], f[2], &mut positions);
            let ca = midpoint(f[2], f[0], &mut positions);
            next_faces.push([f[0], ab, ca]);
            next_faces.push([f[1], bc, ab]);
            next_faces.push([f[2], ca, bc]);
            next_faces.push([ab, bc, ca]);
        }
        faces = next_faces;
    }

    let indices = faces.into_iter().flatten().collect();
    (positions, indices)
}

#[test]
fn scenario_d_closed_icosphere_quality_quarter() {
    let (positions, indices) = icosphere(3);
    assert_eq!(positions.len(), 642);
    assert_eq!(indices.len() / 3, 1280);

    let mesh = mesh_from(positions, indices);
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();
    simplifier.simplify_mesh(0.25).unwrap();
    let out = simplifier.to_mesh_like();

    let triangle_count = out.sub_mesh_indices[0].len() / 3;
    let target = 320.0;
    assert!((triangle_count as f64 - target).abs() / target <= 0.05);

    let incidence = edge_incidence(&out.sub_mesh_indices[0]);
    assert!(incidence.values().all(|&c| c == 2), "output icosphere must stay a closed 2-manifold");
}

#[test]
fn scenario_e_uv_seam_survives_at_quality_one() {
    // Plane A: unit square at y in [0,1].
    let a0 = Pos3::new(0.0, 0.0, 0.0);
    let a1 = Pos3::new(1.0, 0.0, 0.0);
    let a2 = Pos3::new(1.0, 1.0, 0.0);
    let a3 = Pos3::new(0.0, 1.0, 0.0);
    // Plane B: unit square at y in [1,2], sharing the (a2, a3) edge
    // positionally but with its own vertex slots and its own UVs.
    let b0 = a3; // coincides with a3
    let b1 = a2; // coincides with a2
    let b2 = Pos3::new(1.0, 2.0, 0.0);
    let b3 = Pos3::new(0.0, 2.0, 0.0);

    let positions = vec![a0, a1, a2, a3, b0, b1, b2, b3];
    let indices = vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7];

    let uv: Vec<[f64; 4]> = vec![
        [0.0, 0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [1.0, 1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        // plane B's copies of the shared corners carry different UVs:
        [0.3, 0.3, 0.0, 0.0],
        [0.7, 0.3, 0.0, 0.0],
        [1.0, 2.0, 0.0, 0.0],
        [0.0, 2.0, 0.0, 0.0],
    ];
    assert_ne!(uv[3], uv[4]); // a3's uv differs from b0's uv at the same position

    let mut mesh = mesh_from(positions, indices);
    mesh.uvs[0] = Some(uv);

    let options = SimplificationOptions {
        enable_smart_link: true,
        vertex_link_distance: 1e-3,
        ..Default::default()
    };
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, options).unwrap();
    simplifier.simplify_mesh(1.0).unwrap();
    let out = simplifier.to_mesh_like();

    // The merged-position pair must still carry two distinct UV values.
    let out_uv = out.uvs[0].as_ref().unwrap();
    let shared_position = Pos3::new(1.0, 1.0, 0.0);
    let mut uvs_at_shared_position = Vec::new();
    for (i, p) in out.positions.iter().enumerate() {
        if (p - shared_position).norm() < 1e-9 {
            uvs_at_shared_position.push(out_uv[i]);
        }
    }
    assert!(uvs_at_shared_position.len() >= 2);
    assert!(uvs_at_shared_position.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn scenario_f_degenerate_input_rejected() {
    let mut simplifier = MeshSimplifier::new(SimplificationOptions::default()).unwrap();
    let err = simplifier.add_sub_mesh_triangles(&[0, 1]).unwrap_err();
    assert!(matches!(err, SimplifyError::InvalidArgument(_)));

    // quality clamps below zero to zero: a simple open quad should fully
    // collapse away.
    let mesh = mesh_from(
        vec![Pos3::new(0.0, 0.0, 0.0), Pos3::new(1.0, 0.0, 0.0), Pos3::new(1.0, 1.0, 0.0), Pos3::new(0.0, 1.0, 0.0)],
        vec![0, 1, 2, 0, 2, 3],
    );
    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();
    simplifier.simplify_mesh(-0.5).unwrap();
    assert_eq!(simplifier.triangle_count(), 0);

    let bad_options = SimplificationOptions {
        max_iteration_count: 0,
        ..Default::default()
    };
    assert!(matches!(
        MeshSimplifier::new(bad_options).unwrap_err(),
        SimplifyError::InvalidOptions { property: "max_iteration_count", .. }
    ));
}

#[test]
fn scenario_g_blend_shape_deltas_stay_aligned_after_simplification() {
    let mut mesh = unit_cube(0.5);
    let vertex_count = mesh.positions.len();
    mesh.blend_shapes = vec![BlendShape {
        name: "squash".to_string(),
        frames: vec![BlendShapeFrame {
            weight: 1.0,
            // One distinctive, position-matching delta per vertex, so a
            // surviving vertex's delta can be checked against its source.
            delta_positions: mesh.positions.iter().map(|p| nalgebra::Vector3::new(p.x, p.y, p.z)).collect(),
            delta_normals: vec![nalgebra::Vector3::zeros(); vertex_count],
            delta_tangents: vec![nalgebra::Vector3::zeros(); vertex_count],
        }],
    }];

    let mut simplifier = MeshSimplifier::from_mesh(&mesh, SimplificationOptions::default()).unwrap();
    simplifier.simplify_mesh(0.5).unwrap();
    let out = simplifier.to_mesh_like();

    assert_eq!(out.blend_shapes.len(), 1);
    let frame = &out.blend_shapes[0].frames[0];
    // Every delta array must be reindexed down to the new (smaller)
    // vertex count, exactly like every other per-vertex stream.
    assert_eq!(frame.delta_positions.len(), out.positions.len());
    assert_eq!(frame.delta_normals.len(), out.positions.len());
    assert_eq!(frame.delta_tangents.len(), out.positions.len());
}
