//! Double-precision vector helpers and the symmetric quadric matrix.
//!
//! The position type is `nalgebra::Point3<f64>` and displacement/normal
//! type is `nalgebra::Vector3<f64>` throughout the crate, leaning on
//! `nalgebra` rather than a hand-rolled vector type.

use nalgebra::{Point3, Vector3};

pub type Vec3 = Vector3<f64>;
pub type Pos3 = Point3<f64>;

/// Normalize `v`, treating a near-zero length as the zero vector instead of
/// propagating NaN.
pub fn safe_normalize(v: Vec3) -> Vec3 {
    let len = v.norm();
    if len < 1e-12 {
        Vec3::zeros()
    } else {
        v / len
    }
}

/// Area of the triangle `(p0, p1, p2)`. Reserved for future weighted
/// quadrics; not consulted by the present error calculation.
pub fn triangle_area(p0: Pos3, p1: Pos3, p2: Pos3) -> f64 {
    (p1 - p0).cross(&(p2 - p0)).norm() / 2.0
}

/// The 10 upper-triangular coefficients of a symmetric 4x4 quadric matrix.
///
/// Layout (row-major, symmetric so only the upper triangle is stored):
/// ```text
/// m0 m1 m2 m3
/// m1 m4 m5 m6
/// m2 m5 m7 m8
/// m3 m6 m8 m9
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricMatrix {
    m: [f64; 10],
}

impl Default for SymmetricMatrix {
    fn default() -> Self {
        Self::zero()
    }
}

impl SymmetricMatrix {
    pub fn zero() -> Self {
        SymmetricMatrix { m: [0.0; 10] }
    }

    /// Build the plane quadric for the plane `ax + by + cz + d = 0`.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        SymmetricMatrix {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.m[index]
    }

    #[allow(clippy::too_many_arguments)]
    fn det(
        &self,
        a11: usize,
        a12: usize,
        a13: usize,
        a21: usize,
        a22: usize,
        a23: usize,
        a31: usize,
        a32: usize,
        a33: usize,
    ) -> f64 {
        self.m[a11] * self.m[a22] * self.m[a33]
            + self.m[a13] * self.m[a21] * self.m[a32]
            + self.m[a12] * self.m[a23] * self.m[a31]
            - self.m[a13] * self.m[a22] * self.m[a31]
            - self.m[a11] * self.m[a23] * self.m[a32]
            - self.m[a12] * self.m[a21] * self.m[a33]
    }

    /// Determinant of the upper-left 3x3 block (the `A` in `Ap = b`).
    pub fn determinant1(&self) -> f64 {
        self.det(0, 1, 2, 1, 4, 5, 2, 5, 7)
    }

    /// `det2..det4` are `A` with one column swapped for the constant
    /// column, per Cramer's rule, used to solve for the optimal collapse
    /// position `p* = (-det2/det1, det3/det1, -det4/det1)`.
    pub fn determinant2(&self) -> f64 {
        self.det(1, 2, 3, 4, 5, 6, 5, 7, 8)
    }

    pub fn determinant3(&self) -> f64 {
        self.det(0, 2, 3, 1, 5, 6, 2, 7, 8)
    }

    pub fn determinant4(&self) -> f64 {
        self.det(0, 1, 3, 1, 4, 6, 2, 5, 8)
    }

    /// `x^T Q x` for homogeneous `x = (x, y, z, 1)`.
    pub fn vertex_error(&self, p: Pos3) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        self.m[0] * x * x
            + 2.0 * self.m[1] * x * y
            + 2.0 * self.m[2] * x * z
            + 2.0 * self.m[3] * x
            + self.m[4] * y * y
            + 2.0 * self.m[5] * y * z
            + 2.0 * self.m[6] * y
            + self.m[7] * z * z
            + 2.0 * self.m[8] * z
            + self.m[9]
    }

    /// Solve for the position minimizing `p^T Q p`, if the system is
    /// well-conditioned. Returns `None` when `|det1| <= eps`.
    pub fn optimal_position(&self, eps: f64) -> Option<Pos3> {
        let det = self.determinant1();
        if det.abs() <= eps {
            return None;
        }
        Some(Pos3::new(
            -self.determinant2() / det,
            self.determinant3() / det,
            -self.determinant4() / det,
        ))
    }
}

impl std::ops::Add for SymmetricMatrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut m = self.m;
        for i in 0..10 {
            m[i] += rhs.m[i];
        }
        SymmetricMatrix { m }
    }
}

impl std::ops::AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..10 {
            self.m[i] += rhs.m[i];
        }
    }
}
