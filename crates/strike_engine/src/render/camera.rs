//! # First-person camera
//!
//! Position plus yaw/pitch orientation and a perspective projection. The
//! warmup sweep saves and restores this struct wholesale, so every field is
//! plain data and equality is exact.

use crate::foundation::math::{utils, Vec3};

/// Perspective camera with yaw/pitch orientation
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Rotation around +Y in radians
    pub yaw: f32,

    /// Rotation above the horizon in radians
    pub pitch: f32,

    /// Vertical field of view in degrees
    pub fov_degrees: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera looking down -Z
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees,
            aspect,
            near,
            far,
        }
    }

    /// Vertical field of view in radians
    pub fn fov_radians(&self) -> f32 {
        utils::deg_to_rad(self.fov_degrees)
    }

    /// Horizontal field of view in radians
    pub fn horizontal_fov_radians(&self) -> f32 {
        2.0 * ((self.fov_radians() * 0.5).tan() * self.aspect).atan()
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        utils::forward_from_yaw_pitch(self.yaw, self.pitch)
    }

    /// Point the camera along a yaw/pitch pair
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
    }

    /// Update aspect ratio for viewport changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Whether a world point lies inside the view cone and depth range.
    ///
    /// Uses a cone of half-angle `max(hfov, vfov) / 2`, which is what the
    /// warmup placement needs; it is not a full six-plane test.
    pub fn contains_point(&self, point: &Vec3) -> bool {
        let to_point = point - self.position;
        let distance = to_point.norm();
        if distance < self.near || distance > self.far {
            return false;
        }
        let half_angle = self.fov_radians().max(self.horizontal_fov_radians()) * 0.5;
        let cos_angle = to_point.dot(&self.forward()) / distance;
        cos_angle >= half_angle.cos()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::zeros(), 75.0, 16.0 / 9.0, 0.1, 400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ahead_is_visible() {
        let camera = Camera::default();
        assert!(camera.contains_point(&Vec3::new(0.0, 0.0, -10.0)));
    }

    #[test]
    fn test_point_behind_is_not_visible() {
        let camera = Camera::default();
        assert!(!camera.contains_point(&Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_point_past_far_plane_is_not_visible() {
        let camera = Camera::default();
        assert!(!camera.contains_point(&Vec3::new(0.0, 0.0, -1000.0)));
    }

    #[test]
    fn test_horizontal_fov_wider_than_vertical_for_widescreen() {
        let camera = Camera::default();
        assert!(camera.horizontal_fov_radians() > camera.fov_radians());
    }
}
