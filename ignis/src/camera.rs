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

//! The camera and its FPS-style controller, which feed the frame graph's
//! per-frame scene data. The thing that reads raw input devices is a host
//! concern (`SPEC_FULL.md` §1); this only owns the numbers a controller
//! produces and the matrices a camera derives from them.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub aspect_ratio: f32,
    pub field_of_view: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Camera {
    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>, aspect_ratio: f32) -> Self {
        Self {
            position,
            rotation,
            aspect_ratio,
            field_of_view: 45.0f32.to_radians(),
            near_clip: 0.1,
            far_clip: 1000.0,
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let forward = self.rotation * Vector3::z();
        let up = self.rotation * Vector3::y();
        Matrix4::look_at_rh(&self.position, &(self.position + forward), &up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect_ratio, self.field_of_view, self.near_clip, self.far_clip)
    }
}

/// Accumulates yaw/pitch from input deltas into the camera's rotation, and
/// turns forward/back/strafe flags into a movement vector. Ported from
/// `FPS_Camera_Controller`/`control_camera` in the original engine.
pub struct FpsCameraController {
    pub pitch: f32,
    pub yaw: f32,
    pub rotation_speed: f32,
    pub base_movement_speed: f32,
    pub max_movement_speed: f32,
}

impl FpsCameraController {
    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self {
            pitch,
            yaw,
            rotation_speed: 45.0f32.to_radians(),
            base_movement_speed: 15.0,
            max_movement_speed: 35.0,
        }
    }

    pub fn apply_look_delta(&mut self, delta_x: f32, delta_y: f32, delta_time: f32) {
        self.yaw += delta_x * self.rotation_speed * delta_time;
        self.pitch = (self.pitch + delta_y * self.rotation_speed * delta_time).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.pitch, self.yaw, 0.0)
    }

    pub fn movement_speed(&self, move_fast: bool) -> f32 {
        if move_fast {
            self.max_movement_speed
        } else {
            self.base_movement_speed
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn look_delta_accumulates_into_yaw_and_pitch() {
        let mut controller = FpsCameraController::new(0.0, 0.0);
        controller.apply_look_delta(1.0, 0.0, 1.0);
        assert!(controller.yaw > 0.0);
        assert_eq!(controller.pitch, 0.0);
    }

    #[test]
    fn pitch_is_clamped_to_avoid_gimbal_flip() {
        let mut controller = FpsCameraController::new(0.0, 0.0);
        for _ in 0..100 {
            controller.apply_look_delta(0.0, 10.0, 1.0);
        }
        assert!(controller.pitch < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn move_fast_selects_the_higher_speed() {
        let controller = FpsCameraController::new(0.0, 0.0);
        assert_eq!(controller.movement_speed(false), controller.base_movement_speed);
        assert_eq!(controller.movement_speed(true), controller.max_movement_speed);
    }
}
