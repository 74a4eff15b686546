// Copyright (c) 2024-present Ignis Engine Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! A node's local transform: position, Euler angles, and scale. Rotation is
//! derived from the Euler angles rather than stored independently, which is
//! deliberately simpler than a pivot/offset transform stack - `SPEC_FULL.md`
//! §4.5 calls for `{position, euler, rotation (derived), scale}`, not the
//! FBX-style pivot transform a full DCC import pipeline would need.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub euler: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            euler: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.euler.x, self.euler.y, self.euler.z)
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position)
            * self.rotation().to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Matrix4::identity());
    }

    #[test]
    fn translation_places_origin_at_position() {
        let mut t = Transform::default();
        t.position = Vector3::new(1.0, 2.0, 3.0);
        let p = t.matrix().transform_point(&nalgebra::Point3::origin());
        assert_eq!(p, nalgebra::Point3::new(1.0, 2.0, 3.0));
    }
}
