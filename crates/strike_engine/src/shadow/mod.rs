//! Shadow map scheduling
//!
//! One directional light follows the player. Re-rendering its shadow map
//! every frame is wasteful; re-rendering it only on large moves makes the
//! shadows swim. The scheduler snaps the player to the shadow map's texel
//! grid and refreshes on a cell change or after a short interval.

pub mod scheduler;

pub use scheduler::{ShadowUpdateScheduler, SnapCell};
