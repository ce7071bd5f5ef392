//! Object pooling for transient effects

pub mod resource_pool;

pub use resource_pool::{EffectState, PoolError, PoolKey, PoolStats, Poolable, ReleaseOutcome, ResourcePool};
