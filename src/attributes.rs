//! Per-vertex attribute streams.
//!
//! Every stream is a buffer parallel to the vertex array. A length mismatch
//! on a setter is a warning, not an error: the stream is cleared and a
//! [`log::warn!`] is emitted, so a caller using a silenced logging sink
//! degrades gracefully instead of crashing mid-import.

use nalgebra::{Vector2, Vector3, Vector4};

pub type Vec3 = Vector3<f64>;
pub type Vec4 = Vector4<f64>;

pub const MAX_UV_CHANNELS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeight {
    pub bone_indices: [i32; 4],
    pub weights: [f32; 4],
}

/// A single UV channel, mutually exclusive between 2/3/4 component width.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UvChannel {
    #[default]
    None,
    Uv2(Vec<Vector2<f64>>),
    Uv3(Vec<Vector3<f64>>),
    Uv4(Vec<Vector4<f64>>),
}

impl UvChannel {
    pub fn len(&self) -> usize {
        match self {
            UvChannel::None => 0,
            UvChannel::Uv2(v) => v.len(),
            UvChannel::Uv3(v) => v.len(),
            UvChannel::Uv4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component_count(&self) -> u8 {
        match self {
            UvChannel::None => 0,
            UvChannel::Uv2(_) => 2,
            UvChannel::Uv3(_) => 3,
            UvChannel::Uv4(_) => 4,
        }
    }

    /// The 2D (u, v) coordinate at `index`, used by the boundary classifier
    /// to tell UV-seam apart from UV-foldover.
    pub fn uv2_at(&self, index: usize) -> Option<Vector2<f64>> {
        match self {
            UvChannel::None => None,
            UvChannel::Uv2(v) => v.get(index).copied(),
            UvChannel::Uv3(v) => v.get(index).map(|p| Vector2::new(p.x, p.y)),
            UvChannel::Uv4(v) => v.get(index).map(|p| Vector2::new(p.x, p.y)),
        }
    }

    /// Raw `[x, y, z, w]` form used at the host boundary ([`MeshLike`]),
    /// zero-padded to 4 components.
    pub fn to_raw(&self) -> Option<Vec<[f64; 4]>> {
        match self {
            UvChannel::None => None,
            UvChannel::Uv2(v) => Some(v.iter().map(|p| [p.x, p.y, 0.0, 0.0]).collect()),
            UvChannel::Uv3(v) => Some(v.iter().map(|p| [p.x, p.y, p.z, 0.0]).collect()),
            UvChannel::Uv4(v) => Some(v.iter().map(|p| [p.x, p.y, p.z, p.w]).collect()),
        }
    }

    /// Linearly blend three source entries by barycentric weights, writing
    /// the result into `dest`. Used by the collapse executor. No-op if any index is out of range or the stream is empty.
    pub fn interpolate(&mut self, dest: usize, sources: [usize; 3], weights: [f64; 3]) {
        match self {
            UvChannel::None => {}
            UvChannel::Uv2(v) => interpolate_into(v, dest, sources, weights),
            UvChannel::Uv3(v) => interpolate_into(v, dest, sources, weights),
            UvChannel::Uv4(v) => interpolate_into(v, dest, sources, weights),
        }
    }
}

fn interpolate_into<T>(v: &mut [T], dest: usize, sources: [usize; 3], weights: [f64; 3])
where
    T: Copy + std::ops::Mul<f64, Output = T> + std::ops::Add<Output = T>,
{
    if dest >= v.len() || sources.iter().any(|&s| s >= v.len()) {
        return;
    }
    let blended = v[sources[0]] * weights[0] + v[sources[1]] * weights[1] + v[sources[2]] * weights[2];
    v[dest] = blended;
}

/// Detect the minimal UV component width (2, 3, or 4) that losslessly
/// represents `values`: the smallest width whose dropped trailing
/// components are all zero across every entry.
pub fn detect_uv_component_count(values: &[[f64; 4]]) -> u8 {
    let mut needs4 = false;
    let mut needs3 = false;
    for v in values {
        if v[3] != 0.0 {
            needs4 = true;
        }
        if v[2] != 0.0 {
            needs3 = true;
        }
    }
    if needs4 {
        4
    } else if needs3 {
        3
    } else {
        2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendShapeFrame {
    pub weight: f64,
    pub delta_positions: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

impl BlendShapeFrame {
    /// Blend this frame's delta arrays at a collapse. Deltas are
    /// displacement vectors, not directions, so unlike normals/tangents
    /// they are never renormalized after blending.
    fn interpolate(&mut self, dest: usize, sources: [usize; 3], weights: [f64; 3]) {
        interpolate_into(&mut self.delta_positions, dest, sources, weights);
        interpolate_into(&mut self.delta_normals, dest, sources, weights);
        interpolate_into(&mut self.delta_tangents, dest, sources, weights);
    }

    fn truncate(&mut self, len: usize) {
        self.delta_positions.truncate(len);
        self.delta_normals.truncate(len);
        self.delta_tangents.truncate(len);
    }

    /// Reindex every delta array by `order`, the same `(geometry, attribute)`
    /// index pairs the compactor uses for every other attribute stream.
    pub fn remap(&mut self, order: &[(usize, usize)]) {
        self.delta_positions = order.iter().map(|&(_, ai)| self.delta_positions.get(ai).copied().unwrap_or_default()).collect();
        self.delta_normals = order.iter().map(|&(_, ai)| self.delta_normals.get(ai).copied().unwrap_or_default()).collect();
        self.delta_tangents = order.iter().map(|&(_, ai)| self.delta_tangents.get(ai).copied().unwrap_or_default()).collect();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

/// Attribute streams owned by the simplifier, parallel to the vertex array.
#[derive(Debug, Clone, Default)]
pub struct AttributeStreams {
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
    pub colors: Option<Vec<Vec4>>,
    pub bone_weights: Option<Vec<BoneWeight>>,
    pub uv: [UvChannel; MAX_UV_CHANNELS],
    pub bindposes: Option<Vec<nalgebra::Matrix4<f64>>>,
    pub blend_shapes: Vec<BlendShape>,
}

macro_rules! set_stream {
    ($name:ident, $field:ident, $ty:ty) => {
        /// Accepts an array equal in length to the current vertex count;
        /// a length mismatch clears the stream and logs a warning.
        pub fn $name(&mut self, values: &[$ty], vertex_count: usize) {
            if values.len() != vertex_count {
                log::warn!(
                    "{} length {} does not match vertex count {}; clearing stream",
                    stringify!($field),
                    values.len(),
                    vertex_count
                );
                self.$field = None;
                return;
            }
            self.$field = Some(values.to_vec());
        }
    };
}

impl AttributeStreams {
    set_stream!(set_normals, normals, Vec3);
    set_stream!(set_tangents, tangents, Vec4);
    set_stream!(set_colors, colors, Vec4);
    set_stream!(set_bone_weights, bone_weights, BoneWeight);

    /// Set UV channel `channel` (0-7) from raw per-vertex values, choosing
    /// component width either automatically or per `manual_components`.
    pub fn set_uv(
        &mut self,
        channel: usize,
        values: &[[f64; 4]],
        vertex_count: usize,
        manual_components: Option<u8>,
    ) {
        if channel >= MAX_UV_CHANNELS {
            log::warn!("uv channel {} out of range; ignoring", channel);
            return;
        }
        if values.len() != vertex_count {
            log::warn!(
                "uv[{}] length {} does not match vertex count {}; clearing channel",
                channel,
                values.len(),
                vertex_count
            );
            self.uv[channel] = UvChannel::None;
            return;
        }
        let components = manual_components.unwrap_or_else(|| detect_uv_component_count(values));
        self.uv[channel] = match components {
            0 => UvChannel::None,
            2 => UvChannel::Uv2(values.iter().map(|v| Vector2::new(v[0], v[1])).collect()),
            3 => UvChannel::Uv3(values.iter().map(|v| Vector3::new(v[0], v[1], v[2])).collect()),
            _ => UvChannel::Uv4(values.iter().map(|v| Vector4::new(v[0], v[1], v[2], v[3])).collect()),
        };
    }

    pub fn truncate(&mut self, len: usize) {
        if let Some(v) = self.normals.as_mut() {
            v.truncate(len);
        }
        if let Some(v) = self.tangents.as_mut() {
            v.truncate(len);
        }
        if let Some(v) = self.colors.as_mut() {
            v.truncate(len);
        }
        if let Some(v) = self.bone_weights.as_mut() {
            v.truncate(len);
        }
        for uv in self.uv.iter_mut() {
            match uv {
                UvChannel::None => {}
                UvChannel::Uv2(v) => v.truncate(len),
                UvChannel::Uv3(v) => v.truncate(len),
                UvChannel::Uv4(v) => v.truncate(len),
            }
        }
        for shape in self.blend_shapes.iter_mut() {
            for frame in shape.frames.iter_mut() {
                frame.truncate(len);
            }
        }
    }

    /// Blend every blend-shape frame's delta arrays at `sources` by
    /// `weights` into `dest`, the same way normals/tangents/colors/UVs are
    /// blended at a collapse.
    pub fn interpolate_blend_shapes(&mut self, dest: usize, sources: [usize; 3], weights: [f64; 3]) {
        for shape in self.blend_shapes.iter_mut() {
            for frame in shape.frames.iter_mut() {
                frame.interpolate(dest, sources, weights);
            }
        }
    }
}

/// Host-facing plain mesh struct: the only thing the core depends on from
/// its caller.
#[derive(Debug, Clone, Default)]
pub struct MeshLike {
    pub positions: Vec<nalgebra::Point3<f64>>,
    pub sub_mesh_indices: Vec<Vec<u32>>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
    pub colors: Option<Vec<Vec4>>,
    pub uvs: [Option<Vec<[f64; 4]>>; MAX_UV_CHANNELS],
    pub bone_weights: Option<Vec<BoneWeight>>,
    pub bindposes: Option<Vec<nalgebra::Matrix4<f64>>>,
    pub blend_shapes: Vec<BlendShape>,
}
