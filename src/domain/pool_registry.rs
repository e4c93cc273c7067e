//! Named lookup over object pools.
//!
//! [`PoolRegistry`] is the single entry point gameplay code uses to spawn
//! and despawn pooled entities. It owns every [`ObjectPool`] by name and
//! the [`DelayedReleaseScheduler`] that drives timed despawns, so that
//! tearing down a pool also cancels the timers pointing into it.

use std::collections::HashMap;
use std::time::Duration;

use super::object_pool::{Factory, ObjectPool, PoolConfig};
use super::scheduler::{DelayedReleaseScheduler, PendingRelease, ReleaseTarget};
use super::{EntityHandle, Generation, PoolName, PoolStats, Poolable};
use crate::error::PoolError;

/// Pools keyed by name. Split from the registry so the scheduler can
/// borrow it mutably while the registry holds the scheduler.
#[derive(Debug)]
struct PoolMap<T: Poolable>(HashMap<PoolName, ObjectPool<T>>);

impl<T: Poolable> ReleaseTarget for PoolMap<T> {
    fn current_generation(&self, pool: &PoolName, handle: EntityHandle) -> Option<Generation> {
        self.0.get(pool).and_then(|p| p.generation(handle))
    }

    fn release_expired(&mut self, pool: &PoolName, handle: EntityHandle) -> bool {
        self.0.get_mut(pool).is_some_and(|p| p.release(handle))
    }
}

/// Central store for all pools of one entity type.
///
/// Every pool in a registry shares `T`. Games with several kinds of
/// pooled entity either make `T` an enum over those kinds or keep one
/// registry (and one [`crate::service::Session`]) per entity type.
///
/// Every operation is synchronous and runs on the caller's tick; there is
/// no locking. Convenience methods (`spawn`, `despawn`, ...) log failures
/// and return `Option`/`bool`; the `try_` variants return the
/// [`PoolError`] instead.
#[derive(Debug)]
pub struct PoolRegistry<T: Poolable> {
    pools: PoolMap<T>,
    scheduler: DelayedReleaseScheduler,
}

impl<T: Poolable> PoolRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: PoolMap(HashMap::new()),
            scheduler: DelayedReleaseScheduler::new(),
        }
    }

    /// Creates and registers a pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DuplicateRegistration`] if `name` is taken (the
    /// existing pool is left untouched), or whatever
    /// [`ObjectPool::create`] reports.
    pub fn create_pool(
        &mut self,
        name: impl Into<PoolName>,
        factory: Factory<T>,
        config: PoolConfig,
    ) -> Result<(), PoolError> {
        let name = name.into();
        if self.pools.0.contains_key(&name) {
            tracing::warn!(pool = %name, "pool already exists; ignoring");
            return Err(PoolError::DuplicateRegistration(name));
        }
        let pool = ObjectPool::create(name.clone(), factory, config)?;
        tracing::info!(
            pool = %name,
            initial_size = pool.len(),
            max_size = config.max_size,
            auto_expand = config.auto_expand,
            "pool created"
        );
        self.pools.0.insert(name, pool);
        Ok(())
    }

    /// Acquires an entity from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolNotFound`] for an unknown name, otherwise
    /// whatever [`ObjectPool::acquire`] reports.
    pub fn try_spawn(&mut self, name: &str, params: &T::Params) -> Result<EntityHandle, PoolError> {
        self.pools
            .0
            .get_mut(name)
            .ok_or_else(|| PoolError::PoolNotFound(PoolName::from(name)))?
            .acquire(params)
    }

    /// Acquires an entity from `name`, logging and returning `None` on
    /// failure. An exhausted pool is an expected outcome, not a crash.
    pub fn spawn(&mut self, name: &str, params: &T::Params) -> Option<EntityHandle> {
        match self.try_spawn(name, params) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(pool = name, kind = err.kind(), error = %err, "spawn failed");
                None
            }
        }
    }

    /// Returns `handle` to `name`, cancelling any timer still pending for
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolNotFound`] for an unknown name. Releasing a
    /// free or foreign handle is not an error and yields `Ok(false)`.
    pub fn try_despawn(&mut self, name: &str, handle: EntityHandle) -> Result<bool, PoolError> {
        let pool = self
            .pools
            .0
            .get_mut(name)
            .ok_or_else(|| PoolError::PoolNotFound(PoolName::from(name)))?;
        let released = pool.release(handle);
        let cancelled = self.scheduler.cancel(pool.name(), handle);
        if cancelled > 0 {
            tracing::debug!(pool = name, %handle, cancelled, "pending releases cancelled");
        }
        Ok(released)
    }

    /// Like [`try_despawn`](Self::try_despawn) but logs an unknown pool
    /// and returns `false`.
    pub fn despawn(&mut self, name: &str, handle: EntityHandle) -> bool {
        self.try_despawn(name, handle).unwrap_or_else(|err| {
            tracing::warn!(pool = name, %handle, error = %err, "despawn failed");
            false
        })
    }

    /// Schedules `handle` to be despawned after `delay`.
    ///
    /// The timer remembers the entity's current generation; if the entity
    /// is despawned and spawned again before the timer runs out, the timer
    /// does nothing. Returns `false` (logged) if the pool is unknown or the
    /// handle is not in use.
    pub fn despawn_after_delay(&mut self, name: &str, handle: EntityHandle, delay: Duration) -> bool {
        let Some(pool) = self.pools.0.get(name) else {
            tracing::warn!(pool = name, %handle, "delayed despawn on unknown pool");
            return false;
        };
        let generation = match pool.generation(handle) {
            Some(generation) if pool.is_in_use(handle) => generation,
            _ => {
                tracing::warn!(pool = name, %handle, "delayed despawn of entity not in use");
                return false;
            }
        };
        self.scheduler
            .schedule(pool.name().clone(), handle, generation, delay);
        true
    }

    /// Advances pending delayed despawns by `dt`, firing those that are
    /// due. Returns the releases that actually happened.
    pub fn tick(&mut self, dt: Duration) -> Vec<PendingRelease> {
        self.scheduler.advance(dt, &mut self.pools)
    }

    /// Destroys every entity of `name` and cancels its timers. The pool
    /// stays registered and refills lazily.
    ///
    /// Returns `false` (logged) if the name is unknown.
    pub fn clear_pool(&mut self, name: &str) -> bool {
        let Some(pool) = self.pools.0.get_mut(name) else {
            tracing::warn!(pool = name, "clear of unknown pool");
            return false;
        };
        pool.clear();
        self.scheduler.cancel_pool(pool.name());
        true
    }

    /// Clears every pool and cancels every timer.
    pub fn clear_all(&mut self) {
        for pool in self.pools.0.values_mut() {
            pool.clear();
        }
        let cancelled = self.scheduler.cancel_all();
        tracing::info!(pools = self.pools.0.len(), cancelled, "all pools cleared");
    }

    /// Unregisters `name`, returning its pool. Timers into it are
    /// cancelled.
    pub fn remove_pool(&mut self, name: &str) -> Option<ObjectPool<T>> {
        let pool = self.pools.0.remove(name)?;
        self.scheduler.cancel_pool(pool.name());
        tracing::info!(pool = name, "pool removed");
        Some(pool)
    }

    /// Returns `"name: free/total (max)"` or `"name: not found"`.
    #[must_use]
    pub fn get_stats(&self, name: &str) -> String {
        self.stats(name)
            .map_or_else(|| format!("{name}: not found"), |stats| stats.to_string())
    }

    /// Returns the occupancy of `name`.
    #[must_use]
    pub fn stats(&self, name: &str) -> Option<PoolStats> {
        self.pools.0.get(name).map(ObjectPool::stats)
    }

    /// Returns the occupancy of every pool, sorted by name.
    #[must_use]
    pub fn all_stats(&self) -> Vec<PoolStats> {
        let mut stats: Vec<PoolStats> = self.pools.0.values().map(ObjectPool::stats).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Returns the pool registered as `name`.
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&ObjectPool<T>> {
        self.pools.0.get(name)
    }

    /// Returns the pool registered as `name`, mutably.
    pub fn pool_mut(&mut self, name: &str) -> Option<&mut ObjectPool<T>> {
        self.pools.0.get_mut(name)
    }

    /// Returns the in-use entity `handle` of pool `name`.
    #[must_use]
    pub fn get(&self, name: &str, handle: EntityHandle) -> Option<&T> {
        self.pool(name).and_then(|pool| pool.get(handle))
    }

    /// Returns the in-use entity `handle` of pool `name`, mutably.
    pub fn get_mut(&mut self, name: &str, handle: EntityHandle) -> Option<&mut T> {
        self.pool_mut(name).and_then(|pool| pool.get_mut(handle))
    }

    /// Returns the scheduler's pending delayed despawns.
    #[must_use]
    pub fn pending_releases(&self) -> &DelayedReleaseScheduler {
        &self.scheduler
    }

    /// Returns `true` if a pool named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pools.0.contains_key(name)
    }

    /// Returns the number of pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.0.len()
    }

    /// Returns `true` if no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.0.is_empty()
    }
}

impl<T: Poolable> Default for PoolRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::object_pool::tests::{Dummy, dummy_factory};

    const ORIGIN: (f32, f32) = (0.0, 0.0);

    fn registry_with(name: &str, config: PoolConfig) -> PoolRegistry<Dummy> {
        let mut registry = PoolRegistry::new();
        let result = registry.create_pool(name, dummy_factory(), config);
        assert!(result.is_ok());
        registry
    }

    fn secs(value: f32) -> Duration {
        Duration::from_secs_f32(value)
    }

    #[test]
    fn create_and_spawn() {
        let mut registry = registry_with("Bullets", PoolConfig::new(2, 4, false));
        assert!(registry.contains("Bullets"));
        assert_eq!(registry.len(), 1);

        let Some(handle) = registry.spawn("Bullets", &(1.0, 1.0)) else {
            panic!("spawn failed");
        };
        assert!(registry.get("Bullets", handle).is_some());
        assert_eq!(registry.get_stats("Bullets"), "Bullets: 1/2 (4)");
    }

    #[test]
    fn duplicate_registration_keeps_existing_pool() {
        let mut registry = registry_with("Bullets", PoolConfig::new(2, 4, false));
        let result = registry.create_pool("Bullets", dummy_factory(), PoolConfig::new(9, 9, true));
        assert!(matches!(result, Err(PoolError::DuplicateRegistration(_))));

        let Some(stats) = registry.stats("Bullets") else {
            panic!("pool vanished");
        };
        assert_eq!(stats.total, 2);
        assert_eq!(stats.max_size, 4);
    }

    #[test]
    fn unknown_pool_is_reported() {
        let mut registry: PoolRegistry<Dummy> = PoolRegistry::new();
        assert!(registry.spawn("Ghosts", &ORIGIN).is_none());
        assert!(matches!(
            registry.try_spawn("Ghosts", &ORIGIN),
            Err(PoolError::PoolNotFound(_))
        ));
        assert!(!registry.despawn("Ghosts", EntityHandle::new(0)));
        assert!(!registry.despawn_after_delay("Ghosts", EntityHandle::new(0), secs(1.0)));
        assert!(!registry.clear_pool("Ghosts"));
        assert_eq!(registry.get_stats("Ghosts"), "Ghosts: not found");
    }

    #[test]
    fn bullets_scenario_exhausts_at_max() {
        let mut registry = registry_with("Bullets", PoolConfig::new(0, 2, false));
        assert!(registry.spawn("Bullets", &ORIGIN).is_some());
        assert!(registry.spawn("Bullets", &ORIGIN).is_some());
        assert!(registry.spawn("Bullets", &ORIGIN).is_none());
        assert!(matches!(
            registry.try_spawn("Bullets", &ORIGIN),
            Err(PoolError::Exhausted { .. })
        ));
    }

    #[test]
    fn delayed_despawn_fires_after_delay() {
        let mut registry = registry_with("Bullets", PoolConfig::new(1, 1, false));
        let Some(handle) = registry.spawn("Bullets", &ORIGIN) else {
            panic!("spawn failed");
        };
        assert!(registry.despawn_after_delay("Bullets", handle, secs(2.0)));

        assert!(registry.tick(secs(1.0)).is_empty());
        assert!(registry.get("Bullets", handle).is_some());

        let fired = registry.tick(secs(1.5));
        assert_eq!(fired.len(), 1);
        assert!(registry.get("Bullets", handle).is_none());
    }

    #[test]
    fn manual_despawn_before_timer_runs_release_hook_once() {
        let mut registry = registry_with("Bullets", PoolConfig::new(1, 1, false));
        let Some(handle) = registry.spawn("Bullets", &ORIGIN) else {
            panic!("spawn failed");
        };
        assert!(registry.despawn_after_delay("Bullets", handle, secs(2.0)));
        let _ = registry.tick(secs(0.5));
        assert!(registry.despawn("Bullets", handle));
        assert!(registry.pending_releases().is_empty());

        assert!(registry.tick(secs(3.0)).is_empty());

        let Some(again) = registry.spawn("Bullets", &ORIGIN) else {
            panic!("respawn failed");
        };
        let Some(dummy) = registry.get("Bullets", again) else {
            panic!("entity missing");
        };
        assert_eq!(dummy.released, 1);
    }

    #[test]
    fn delayed_despawn_rejects_free_handle() {
        let mut registry = registry_with("Bullets", PoolConfig::new(1, 1, false));
        assert!(!registry.despawn_after_delay("Bullets", EntityHandle::new(0), secs(1.0)));
        assert!(registry.pending_releases().is_empty());
    }

    #[test]
    fn clear_pool_cancels_timers_and_refills_lazily() {
        let mut registry = registry_with("Bullets", PoolConfig::new(2, 2, false));
        let Some(handle) = registry.spawn("Bullets", &ORIGIN) else {
            panic!("spawn failed");
        };
        registry.despawn_after_delay("Bullets", handle, secs(1.0));

        assert!(registry.clear_pool("Bullets"));
        assert!(registry.pending_releases().is_empty());
        assert_eq!(registry.get_stats("Bullets"), "Bullets: 0/0 (2)");

        let Some(fresh) = registry.spawn("Bullets", &ORIGIN) else {
            panic!("spawn after clear failed");
        };
        assert!(registry.tick(secs(5.0)).is_empty());
        assert!(registry.get("Bullets", fresh).is_some());
    }

    #[test]
    fn clear_all_and_remove_pool() {
        let mut registry = registry_with("Bullets", PoolConfig::new(1, 2, false));
        let result = registry.create_pool("Enemies", dummy_factory(), PoolConfig::new(1, 2, false));
        assert!(result.is_ok());
        let Some(handle) = registry.spawn("Enemies", &ORIGIN) else {
            panic!("spawn failed");
        };
        registry.despawn_after_delay("Enemies", handle, secs(1.0));

        registry.clear_all();
        assert!(registry.pending_releases().is_empty());
        assert!(registry.all_stats().iter().all(|stats| stats.total == 0));

        assert!(registry.remove_pool("Enemies").is_some());
        assert!(!registry.contains("Enemies"));
        assert!(registry.remove_pool("Enemies").is_none());
    }

    #[test]
    fn all_stats_sorted_by_name() {
        let mut registry = registry_with("Zombies", PoolConfig::new(0, 1, false));
        let _ = registry.create_pool("Arrows", dummy_factory(), PoolConfig::new(0, 1, false));
        let names: Vec<String> = registry
            .all_stats()
            .into_iter()
            .map(|stats| stats.name.to_string())
            .collect();
        assert_eq!(names, vec!["Arrows".to_string(), "Zombies".to_string()]);
    }
}
