//! Perspective camera shared by all carousel items.

use glam::{Mat4, Vec3};

const DEFAULT_FOV_DEG: f32 = 50.0;
const DEFAULT_Z: f32 = 10.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

/// Perspective camera looking down the negative Z axis at the item plane.
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub position: Vec3,
}

impl Camera {
    /// Create a camera with the default field of view and distance.
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_y_deg: DEFAULT_FOV_DEG,
            aspect,
            position: Vec3::new(0.0, 0.0, DEFAULT_Z),
        }
    }

    /// Update the aspect ratio (on surface resize).
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Combined view-projection matrix.
    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, NEAR, FAR);
        let view = Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y);
        proj * view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
