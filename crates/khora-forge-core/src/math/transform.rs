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

//! Translation / rotation / scale transforms and matrix decomposition.

use super::EPSILON;
use serde::{Deserialize, Serialize};

/// A local transform split into its translation, rotation and scale.
///
/// `rotation` is a unit quaternion stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation.
    pub translation: [f32; 3],
    /// Rotation quaternion, `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Non-uniform scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Transform = Transform {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    /// Decomposes a column-major affine matrix (`m[column][row]`).
    ///
    /// The scale of each axis is the length of the matching basis column. A
    /// negative determinant is folded into the X scale so the remaining basis
    /// is a proper rotation. Shear is not representable and is lost.
    pub fn from_matrix(m: &[[f32; 4]; 4]) -> Self {
        let translation = [m[3][0], m[3][1], m[3][2]];

        let col = |i: usize| [m[i][0], m[i][1], m[i][2]];
        let (c0, c1, c2) = (col(0), col(1), col(2));

        let mut scale = [length(c0), length(c1), length(c2)];
        if determinant(c0, c1, c2) < 0.0 {
            scale[0] = -scale[0];
        }

        if scale.iter().any(|s| s.abs() < EPSILON) {
            return Self {
                translation,
                rotation: Transform::IDENTITY.rotation,
                scale,
            };
        }

        let r0 = divide(c0, scale[0]);
        let r1 = divide(c1, scale[1]);
        let r2 = divide(c2, scale[2]);

        Self {
            translation,
            rotation: quaternion_from_basis(r0, r1, r2),
            scale,
        }
    }
}

fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn divide(v: [f32; 3], s: f32) -> [f32; 3] {
    [v[0] / s, v[1] / s, v[2] / s]
}

fn determinant(c0: [f32; 3], c1: [f32; 3], c2: [f32; 3]) -> f32 {
    c0[0] * (c1[1] * c2[2] - c2[1] * c1[2]) - c1[0] * (c0[1] * c2[2] - c2[1] * c0[2])
        + c2[0] * (c0[1] * c1[2] - c1[1] * c0[2])
}

/// Converts an orthonormal basis (the columns of a rotation matrix) into a
/// unit quaternion.
fn quaternion_from_basis(c0: [f32; 3], c1: [f32; 3], c2: [f32; 3]) -> [f32; 4] {
    let (m00, m10, m20) = (c0[0], c0[1], c0[2]);
    let (m01, m11, m21) = (c1[0], c1[1], c1[2]);
    let (m02, m12, m22) = (c2[0], c2[1], c2[2]);

    // http://www.euclideanspace.com/maths/geometry/rotations/conversions/matrixToQuaternion/index.htm
    let trace = m00 + m11 + m22;
    let q = if trace > 0.0 {
        let s = 2.0 * (trace + 1.0).sqrt();
        [(m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s]
    } else if m00 > m11 && m00 > m22 {
        let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
        [0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s]
    } else if m11 > m22 {
        let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
        [(m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s]
    } else {
        let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
        [(m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s]
    };

    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    [q[0] / norm, q[1] / norm, q[2] / norm, q[3] / norm]
}
