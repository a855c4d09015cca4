// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A column-major 4x4 matrix.

use super::{Quaternion, Vec3, Vec4, EPSILON};
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// Used for world transforms, camera view/projection matrices and the
/// light-space matrices derived for shadow mapping. The layout matches what
/// graphics APIs expect for uniform upload.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub const fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix.
    #[inline]
    pub fn row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::from_vec3(v, 1.0))
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Self::from_cols(
            Vec4::X * scale.x,
            Vec4::Y * scale.y,
            Vec4::Z * scale.z,
            Vec4::W,
        )
    }

    /// Creates a rotation matrix from a unit quaternion.
    pub fn from_quat(q: Quaternion) -> Self {
        let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
        let (xx, xy, xz) = (q.x * x2, q.x * y2, q.x * z2);
        let (yy, yz, zz) = (q.y * y2, q.y * z2, q.z * z2);
        let (wx, wy, wz) = (q.w * x2, q.w * y2, q.w * z2);

        Self::from_cols(
            Vec4::new(1.0 - (yy + zz), xy + wz, xz - wy, 0.0),
            Vec4::new(xy - wz, 1.0 - (xx + zz), yz + wx, 0.0),
            Vec4::new(xz + wy, yz - wx, 1.0 - (xx + yy), 0.0),
            Vec4::W,
        )
    }

    /// Composes `translation * rotation * scale`, the usual object-to-world order.
    #[inline]
    pub fn from_scale_rotation_translation(
        scale: Vec3,
        rotation: Quaternion,
        translation: Vec3,
    ) -> Self {
        Self::from_translation(translation) * Self::from_quat(rotation) * Self::from_scale(scale)
    }

    /// Creates a right-handed orthographic projection with a [0, 1] depth range.
    ///
    /// `width` and `height` are the full extents of the view volume, centered
    /// on the view axis.
    pub fn orthographic_rh_zo(width: f32, height: f32, z_near: f32, z_far: f32) -> Self {
        let depth = z_far - z_near;
        Self::from_cols(
            Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -1.0 / depth, 0.0),
            Vec4::new(0.0, 0.0, -z_near / depth, 1.0),
        )
    }

    /// Creates a right-handed perspective projection with a [0, 1] depth range.
    pub fn perspective_rh_zo(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let f = 1.0 / (fov_y * 0.5).tan();
        let range = z_near - z_far;
        Self::from_cols(
            Vec4::new(f / aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, z_far / range, -1.0),
            Vec4::new(0.0, 0.0, z_near * z_far / range, 0.0),
        )
    }

    /// Creates a right-handed view matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` when `eye` and `target` coincide or `up` is parallel to
    /// the view direction.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let forward = target - eye;
        if forward.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let f = forward.normalize();
        let s = f.cross(up);
        if s.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let s = s.normalize();
        let u = s.cross(f);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-eye.dot(s), -eye.dot(u), eye.dot(f), 1.0),
        ))
    }

    /// Computes the inverse using 2x2 sub-determinants.
    /// Returns `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d] = self.cols;

        let s0 = a.x * b.y - b.x * a.y;
        let s1 = a.x * b.z - b.x * a.z;
        let s2 = a.x * b.w - b.x * a.w;
        let s3 = a.y * b.z - b.y * a.z;
        let s4 = a.y * b.w - b.y * a.w;
        let s5 = a.z * b.w - b.z * a.w;

        let c5 = c.z * d.w - d.z * c.w;
        let c4 = c.y * d.w - d.y * c.w;
        let c3 = c.y * d.z - d.y * c.z;
        let c2 = c.x * d.w - d.x * c.w;
        let c1 = c.x * d.z - d.x * c.z;
        let c0 = c.x * d.y - d.x * c.y;

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det.abs() < EPSILON * EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        Some(Self::from_cols(
            Vec4::new(
                (b.y * c5 - b.z * c4 + b.w * c3) * inv,
                (-a.y * c5 + a.z * c4 - a.w * c3) * inv,
                (d.y * s5 - d.z * s4 + d.w * s3) * inv,
                (-c.y * s5 + c.z * s4 - c.w * s3) * inv,
            ),
            Vec4::new(
                (-b.x * c5 + b.z * c2 - b.w * c1) * inv,
                (a.x * c5 - a.z * c2 + a.w * c1) * inv,
                (-d.x * s5 + d.z * s2 - d.w * s1) * inv,
                (c.x * s5 - c.z * s2 + c.w * s1) * inv,
            ),
            Vec4::new(
                (b.x * c4 - b.y * c2 + b.w * c0) * inv,
                (-a.x * c4 + a.y * c2 - a.w * c0) * inv,
                (d.x * s4 - d.y * s2 + d.w * s0) * inv,
                (-c.x * s4 + c.y * s2 - c.w * s0) * inv,
            ),
            Vec4::new(
                (-b.x * c3 + b.y * c1 - b.z * c0) * inv,
                (a.x * c3 - a.y * c1 + a.z * c0) * inv,
                (-d.x * s3 + d.y * s1 - d.z * s0) * inv,
                (c.x * s3 - c.y * s1 + c.z * s0) * inv,
            ),
        ))
    }

    /// Transforms a point (w = 1), applying the perspective divide.
    #[inline]
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        let r = *self * Vec4::from_vec3(p, 1.0);
        if r.w.abs() > EPSILON {
            r.truncate() / r.w
        } else {
            r.truncate()
        }
    }

    /// Returns the matrix as column arrays, ready for uniform upload.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols.map(|c| [c.x, c.y, c.z, c.w])
    }
}

impl Default for Mat4 {
    /// Returns the identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self {
        Self {
            cols: rhs.cols.map(|col| self * col),
        }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}
