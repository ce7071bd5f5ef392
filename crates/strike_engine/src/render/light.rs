//! Shadow-casting sun light that follows the player
//!
//! The light's position and its shadow map's refresh flag only change
//! together: [`ShadowLight::relocate`] is the single mutator for position and
//! target and it always marks the shadow dirty. Moving the light without
//! re-rendering the shadow map makes the map lag the light and shimmer.

use crate::foundation::math::Vec3;

/// Directional light with a movable shadow frustum
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowLight {
    position: Vec3,
    target: Vec3,
    needs_update: bool,
    relocations: u64,
}

impl ShadowLight {
    /// Create a light at `target + offset`, dirty so the first frame renders
    /// its shadow map
    pub fn new(target: Vec3, offset: Vec3) -> Self {
        Self {
            position: target + offset,
            target,
            needs_update: true,
            relocations: 0,
        }
    }

    /// Move the light so it looks at `target` from `target + offset` and mark
    /// the shadow map for re-rendering
    pub fn relocate(&mut self, target: Vec3, offset: Vec3) {
        self.target = target;
        self.position = target + offset;
        self.needs_update = true;
        self.relocations += 1;
        log::trace!("Shadow light relocated to target {:?}", target);
    }

    /// Called after a frame that rendered the shadow map
    pub fn mark_rendered(&mut self) {
        self.needs_update = false;
    }

    /// Light position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Point the shadow frustum is centred on
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Whether the shadow map must be re-rendered
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// How many times the light has been moved
    pub fn relocations(&self) -> u64 {
        self.relocations
    }
}

impl Default for ShadowLight {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::new(40.0, 80.0, 30.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_marks_dirty() {
        let mut light = ShadowLight::default();
        light.mark_rendered();
        assert!(!light.needs_update());

        light.relocate(Vec3::new(4.0, 0.0, 2.0), Vec3::new(0.0, 10.0, 0.0));
        assert!(light.needs_update());
        assert_eq!(light.position(), Vec3::new(4.0, 10.0, 2.0));
        assert_eq!(light.target(), Vec3::new(4.0, 0.0, 2.0));
    }
}
