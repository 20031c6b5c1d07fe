//! Quadric-error-metric triangle mesh decimation: Garland-Heckbert
//! edge-collapse simplification with attribute-preserving collapses,
//! UV-seam/foldover-aware boundary handling, and optional curvature
//! weighting.
//!
//! The entry point is [`MeshSimplifier`]: build one from a [`MeshLike`],
//! configure it with [`SimplificationOptions`], and call
//! [`MeshSimplifier::simplify_mesh`] or
//! [`MeshSimplifier::simplify_mesh_lossless`].

mod attributes;
mod boundary;
mod buffers;
mod collapse;
mod compact;
mod error_metric;
mod errors;
mod flip;
mod mesh_state;
mod numerics;
mod options;
mod output;
mod quadric;
mod simplifier;

pub use attributes::{BlendShape, BlendShapeFrame, BoneWeight, MeshLike, MAX_UV_CHANNELS};
pub use errors::{Result, SimplifyError};
pub use numerics::{Pos3, Vec3};
pub use options::SimplificationOptions;
pub use output::DerivedGeometry;
pub use simplifier::MeshSimplifier;
