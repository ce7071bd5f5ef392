//! Pooled transient effects
//!
//! Short-lived scene objects that appear many times per second in combat.
//! Both kinds implement [`crate::pool::Poolable`] over a
//! [`crate::render::SceneContext`], so a pool can create, hide, reuse and
//! free their scene nodes and GPU visuals.

pub mod explosive;
pub mod trail;

pub use explosive::{ExplosiveEffect, ExplosiveParams};
pub use trail::{TrailEffect, TrailParams};
