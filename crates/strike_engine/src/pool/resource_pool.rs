//! Generic bounded object pool
//!
//! Reuses instances of short-lived, GPU-backed effects instead of allocating
//! and freeing them on every occurrence. One pool type serves every effect
//! kind; what differs per kind is the [`Poolable`] implementation.
//!
//! # Architecture
//!
//! ```text
//! acquire(params) ──► idle list non-empty? ──yes──► pop + reset(params) ──┐
//!                            │ no                                         │
//!                            └──────────► create(params) ─────────────────┤
//!                                                                         ▼
//!                                                                 active slot map
//!                                                                         │
//! release(key) ◄──────────────────────────────────────────────────────────┘
//!      │
//!      ├── idle.len() < capacity ──► park() ──► idle list
//!      └── otherwise ─────────────► dispose()
//! ```
//!
//! An instance lives in exactly one of the two collections. Active instances
//! are addressed by generational keys, so releasing the same key twice is
//! reported as [`PoolError::StaleKey`] instead of parking an instance twice.

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

new_key_type! {
    /// Key of an active pooled instance
    pub struct PoolKey;
}

/// Lifecycle of a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// Checked out and updating
    Active,
    /// Parked in the idle list, invisible
    Pooled,
    /// Resources freed; never reused
    Disposed,
}

/// Contract every pooled type implements.
///
/// `C` is whatever the instance needs to build or tear down its resources
/// (for scene effects, a [`crate::render::SceneContext`]).
pub trait Poolable<C: ?Sized>: Sized {
    /// Initial parameters for one occurrence
    type Params;

    /// Error raised when a fresh instance cannot be built
    type Error;

    /// Build a fresh instance
    fn create(ctx: &mut C, params: &Self::Params) -> Result<Self, Self::Error>;

    /// Prepare a recycled instance for a new occurrence
    fn reset(&mut self, ctx: &mut C, params: &Self::Params);

    /// Return to an idle, invisible state before parking
    fn park(&mut self, ctx: &mut C);

    /// Free every resource the instance owns
    fn dispose(self, ctx: &mut C);
}

/// Pool errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Key does not refer to an active instance (already released or never
    /// issued by this pool)
    #[error("Pool key {0:?} is not active")]
    StaleKey(PoolKey),
}

/// What happened to a released instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Parked for reuse
    Pooled,
    /// Idle list was full; resources freed
    Disposed,
}

/// Counters for monitoring pool behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances built from scratch
    pub created: u64,
    /// Acquisitions served from the idle list
    pub recycled: u64,
    /// Total acquisitions
    pub acquired: u64,
    /// Releases that parked the instance
    pub pooled: u64,
    /// Instances disposed (release overflow plus teardown)
    pub disposed: u64,
}

/// Bounded pool of reusable instances
pub struct ResourcePool<T> {
    name: &'static str,
    capacity: usize,
    active: SlotMap<PoolKey, T>,
    idle: Vec<T>,
    stats: PoolStats,
}

impl<T> ResourcePool<T> {
    /// Create a pool that keeps at most `capacity` idle instances
    pub fn new(name: &'static str, capacity: usize) -> Self {
        log::debug!("Created pool '{}' with idle capacity {}", name, capacity);
        Self {
            name,
            capacity,
            active: SlotMap::with_key(),
            idle: Vec::with_capacity(capacity),
            stats: PoolStats::default(),
        }
    }

    /// Check out an instance, recycling an idle one when available
    pub fn acquire<C: ?Sized>(&mut self, ctx: &mut C, params: &T::Params) -> Result<PoolKey, T::Error>
    where
        T: Poolable<C>,
    {
        let instance = match self.idle.pop() {
            Some(mut recycled) => {
                recycled.reset(ctx, params);
                self.stats.recycled += 1;
                recycled
            }
            None => {
                let fresh = T::create(ctx, params)?;
                self.stats.created += 1;
                fresh
            }
        };
        self.stats.acquired += 1;
        Ok(self.active.insert(instance))
    }

    /// Return an instance. Parks it if the idle list has room, otherwise
    /// disposes it.
    pub fn release<C: ?Sized>(&mut self, ctx: &mut C, key: PoolKey) -> Result<ReleaseOutcome, PoolError>
    where
        T: Poolable<C>,
    {
        let mut instance = self.active.remove(key).ok_or(PoolError::StaleKey(key))?;
        if self.idle.len() < self.capacity {
            instance.park(ctx);
            self.idle.push(instance);
            self.stats.pooled += 1;
            Ok(ReleaseOutcome::Pooled)
        } else {
            instance.dispose(ctx);
            self.stats.disposed += 1;
            Ok(ReleaseOutcome::Disposed)
        }
    }

    /// Release every active instance matching `predicate`. Returns how many
    /// were released.
    pub fn release_where<C: ?Sized>(&mut self, ctx: &mut C, mut predicate: impl FnMut(&T) -> bool) -> usize
    where
        T: Poolable<C>,
    {
        let finished: Vec<PoolKey> = self
            .active
            .iter()
            .filter(|(_, instance)| predicate(*instance))
            .map(|(key, _)| key)
            .collect();
        for key in &finished {
            // Keys were collected from the active map just above.
            let _ = self.release(ctx, *key);
        }
        finished.len()
    }

    /// Release every active instance back into the pool
    pub fn release_all<C: ?Sized>(&mut self, ctx: &mut C) -> usize
    where
        T: Poolable<C>,
    {
        self.release_where(ctx, |_| true)
    }

    /// Dispose every active and idle instance exactly once. Returns the
    /// number disposed.
    pub fn dispose_all<C: ?Sized>(&mut self, ctx: &mut C) -> usize
    where
        T: Poolable<C>,
    {
        let mut count = 0;
        for (_, instance) in self.active.drain() {
            instance.dispose(ctx);
            count += 1;
        }
        for instance in self.idle.drain(..) {
            instance.dispose(ctx);
            count += 1;
        }
        self.stats.disposed += count as u64;
        if count > 0 {
            log::debug!("Pool '{}' disposed {} instances", self.name, count);
        }
        count
    }

    /// Borrow an active instance
    pub fn get(&self, key: PoolKey) -> Option<&T> {
        self.active.get(key)
    }

    /// Mutably borrow an active instance
    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut T> {
        self.active.get_mut(key)
    }

    /// Iterate active instances
    pub fn iter(&self) -> impl Iterator<Item = (PoolKey, &T)> {
        self.active.iter()
    }

    /// Iterate active instances mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolKey, &mut T)> {
        self.active.iter_mut()
    }

    /// Number of active instances
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of idle instances
    pub fn pooled_len(&self) -> usize {
        self.idle.len()
    }

    /// Maximum idle instances
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pool name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Counters since creation
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
