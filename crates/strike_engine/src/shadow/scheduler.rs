//! Texel-snapped shadow refresh scheduling

use crate::config::ShadowConfig;
use crate::foundation::math::Vec3;
use crate::render::ShadowLight;

/// Grid cell the light's ground projection is snapped to, plus time since
/// the last refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapCell {
    /// Cell index along X
    pub x: i64,
    /// Cell index along Z
    pub z: i64,
}

/// Decides when the shadow-casting light follows the player
#[derive(Debug, Clone)]
pub struct ShadowUpdateScheduler {
    texel_size: f32,
    refresh_interval: f32,
    light_offset: Vec3,
    cell: Option<SnapCell>,
    since_refresh: f32,
    refreshes: u64,
}

impl ShadowUpdateScheduler {
    /// Build from shadow settings. Texel size is extent / resolution.
    pub fn new(config: &ShadowConfig) -> Self {
        let resolution = config.resolution.max(1) as f32;
        Self {
            texel_size: config.extent / resolution,
            refresh_interval: config.refresh_interval,
            light_offset: Vec3::from(config.light_offset),
            cell: None,
            since_refresh: 0.0,
            refreshes: 0,
        }
    }

    /// World size of one shadow-map texel
    pub fn texel_size(&self) -> f32 {
        self.texel_size
    }

    /// Cell containing a ground position
    pub fn snap(&self, position: &Vec3) -> SnapCell {
        SnapCell {
            x: (position.x / self.texel_size).round() as i64,
            z: (position.z / self.texel_size).round() as i64,
        }
    }

    /// Advance by `delta_time` and refresh the light if the player's snapped
    /// cell changed or the refresh interval ran out. Returns whether the
    /// light was refreshed.
    pub fn update(&mut self, player_position: &Vec3, delta_time: f32, light: &mut ShadowLight) -> bool {
        self.since_refresh += delta_time;
        let cell = self.snap(player_position);
        let moved = self.cell != Some(cell);
        if !moved && self.since_refresh < self.refresh_interval {
            return false;
        }

        let target = Vec3::new(
            cell.x as f32 * self.texel_size,
            player_position.y,
            cell.z as f32 * self.texel_size,
        );
        light.relocate(target, self.light_offset);
        self.cell = Some(cell);
        self.since_refresh = 0.0;
        self.refreshes += 1;
        true
    }

    /// Forget the last cell so the next update refreshes
    pub fn invalidate(&mut self) {
        self.cell = None;
    }

    /// Current snapped cell, if any refresh has happened
    pub fn cell(&self) -> Option<SnapCell> {
        self.cell
    }

    /// Seconds since the last refresh
    pub fn since_refresh(&self) -> f32 {
        self.since_refresh
    }

    /// Refreshes since construction
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scheduler() -> ShadowUpdateScheduler {
        ShadowUpdateScheduler::new(&ShadowConfig::default())
    }

    fn settled(scheduler: &mut ShadowUpdateScheduler, light: &mut ShadowLight, at: &Vec3) {
        assert!(scheduler.update(at, 0.0, light));
        light.mark_rendered();
    }

    #[test]
    fn test_texel_size_is_extent_over_resolution() {
        let config = ShadowConfig::default();
        assert_relative_eq!(scheduler().texel_size(), config.extent / config.resolution as f32);
    }

    #[test]
    fn test_stationary_player_waits_for_interval() {
        let mut scheduler = scheduler();
        let mut light = ShadowLight::default();
        let position = Vec3::new(3.0, 0.0, 4.0);
        settled(&mut scheduler, &mut light, &position);

        assert!(!scheduler.update(&position, 0.05, &mut light));
        assert!(!light.needs_update());
        assert!(scheduler.update(&position, 0.05, &mut light));
        assert!(light.needs_update());
        assert_relative_eq!(scheduler.since_refresh(), 0.0);
    }

    #[test]
    fn test_cell_change_refreshes_immediately() {
        let mut scheduler = scheduler();
        let mut light = ShadowLight::default();
        settled(&mut scheduler, &mut light, &Vec3::zeros());

        let step = scheduler.texel_size() * 1.5;
        assert!(scheduler.update(&Vec3::new(step, 0.0, 0.0), 0.001, &mut light));
    }

    #[test]
    fn test_slow_sub_texel_motion_still_refreshes() {
        let mut scheduler = scheduler();
        let mut light = ShadowLight::default();
        settled(&mut scheduler, &mut light, &Vec3::zeros());

        let dt = 1.0 / 60.0;
        let creep = scheduler.texel_size() * 0.001;
        let frames = (2.0 * ShadowConfig::default().refresh_interval / dt).ceil() as usize + 1;
        let mut refreshes = 0;
        for frame in 0..frames {
            let position = Vec3::new(creep * frame as f32, 0.0, 0.0);
            if scheduler.update(&position, dt, &mut light) {
                refreshes += 1;
            }
        }
        assert!(refreshes >= 1);
    }

    #[test]
    fn test_refresh_moves_light_and_marks_dirty_together() {
        let config = ShadowConfig::default();
        let mut scheduler = ShadowUpdateScheduler::new(&config);
        let mut light = ShadowLight::default();
        light.mark_rendered();
        let before = light.position();

        let position = Vec3::new(17.3, 2.0, -9.1);
        assert!(scheduler.update(&position, 0.0, &mut light));

        assert!(light.needs_update());
        assert_ne!(light.position(), before);
        let offset = Vec3::from(config.light_offset);
        assert_relative_eq!(light.position(), light.target() + offset);
        let cell = scheduler.cell().unwrap();
        assert_relative_eq!(light.target().x, cell.x as f32 * scheduler.texel_size());
    }
}
