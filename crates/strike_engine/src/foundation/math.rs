//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of helpers the frame loop
//! needs for yaw/pitch orientation and ground-plane work.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Common scalar constants
pub mod constants {
    /// Full turn in radians
    pub const TAU: f32 = std::f32::consts::TAU;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;
}

/// Utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Unit forward vector for a yaw/pitch pair.
    ///
    /// Yaw 0 looks down -Z, positive yaw turns left (counter-clockwise seen
    /// from above), positive pitch looks up.
    pub fn forward_from_yaw_pitch(yaw: f32, pitch: f32) -> Vec3 {
        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Horizontal distance between two points, ignoring height
    pub fn ground_distance_squared(a: &Vec3, b: &Vec3) -> f32 {
        let dx = a.x - b.x;
        let dz = a.z - b.z;
        dx * dx + dz * dz
    }

    /// Distance along a unit-direction ray to the first intersection with a
    /// sphere, or `None` if the ray misses or the sphere is behind the origin
    pub fn ray_sphere_distance(origin: &Vec3, direction: &Vec3, center: &Vec3, radius: f32) -> Option<f32> {
        let to_center = center - origin;
        let along = to_center.dot(direction);
        let closest_sq = to_center.norm_squared() - along * along;
        let radius_sq = radius * radius;
        if closest_sq > radius_sq {
            return None;
        }
        let half_chord = (radius_sq - closest_sq).sqrt();
        let near = along - half_chord;
        let far = along + half_chord;
        if far < 0.0 {
            None
        } else {
            Some(near.max(0.0))
        }
    }
}
