//! Tick-driven delayed release of pooled entities.
//!
//! [`DelayedReleaseScheduler`] keeps a list of [`PendingRelease`] entries.
//! The owning loop calls [`DelayedReleaseScheduler::advance`] once per
//! tick with the elapsed time; entries that run out are revalidated
//! against the entity's current [`Generation`] before anything is
//! released. A handle that was released and re-acquired in the meantime
//! carries a newer generation, so the stale timer is dropped instead of
//! evicting the new occupant.

use std::time::Duration;

use super::{EntityHandle, Generation, PoolName};

/// Whatever owns the entities a scheduler releases.
pub trait ReleaseTarget {
    /// Current generation of `handle` in `pool`, or `None` if the pool or
    /// slot no longer exists.
    fn current_generation(&self, pool: &PoolName, handle: EntityHandle) -> Option<Generation>;

    /// Releases `handle` back into `pool`. Returns `true` if an in-use
    /// entity was actually returned.
    fn release_expired(&mut self, pool: &PoolName, handle: EntityHandle) -> bool;
}

/// A scheduled automatic release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRelease {
    /// Pool that owns the entity.
    pub pool: PoolName,
    /// Entity to release.
    pub handle: EntityHandle,
    /// Generation observed when the release was scheduled.
    pub generation: Generation,
    /// Time left before the release fires.
    pub remaining: Duration,
}

/// Cooperative timer list for delayed releases.
#[derive(Debug, Default)]
pub struct DelayedReleaseScheduler {
    pending: Vec<PendingRelease>,
}

impl DelayedReleaseScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `handle` for release after `delay`.
    ///
    /// A zero delay fires on the next [`advance`](Self::advance).
    pub fn schedule(
        &mut self,
        pool: PoolName,
        handle: EntityHandle,
        generation: Generation,
        delay: Duration,
    ) {
        tracing::debug!(%pool, %handle, %generation, ?delay, "release scheduled");
        self.pending.push(PendingRelease {
            pool,
            handle,
            generation,
            remaining: delay,
        });
    }

    /// Advances every timer by `dt` and fires the ones that ran out, in
    /// scheduling order.
    ///
    /// Returns the entries whose release actually happened. Entries whose
    /// generation no longer matches are discarded silently.
    pub fn advance<R: ReleaseTarget + ?Sized>(
        &mut self,
        dt: Duration,
        target: &mut R,
    ) -> Vec<PendingRelease> {
        for entry in &mut self.pending {
            entry.remaining = entry.remaining.saturating_sub(dt);
        }
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|entry| entry.remaining.is_zero());
        self.pending = waiting;

        let mut fired = Vec::with_capacity(due.len());
        for entry in due {
            match target.current_generation(&entry.pool, entry.handle) {
                Some(current) if current == entry.generation => {
                    if target.release_expired(&entry.pool, entry.handle) {
                        fired.push(entry);
                    }
                }
                current => {
                    tracing::debug!(
                        pool = %entry.pool,
                        handle = %entry.handle,
                        scheduled = %entry.generation,
                        current = ?current,
                        "stale release dropped"
                    );
                }
            }
        }
        fired
    }

    /// Cancels every pending release of `handle` in `pool`. Returns how
    /// many entries were removed.
    pub fn cancel(&mut self, pool: &PoolName, handle: EntityHandle) -> usize {
        self.remove_where(|entry| &entry.pool == pool && entry.handle == handle)
    }

    /// Cancels every pending release targeting `pool`.
    pub fn cancel_pool(&mut self, pool: &PoolName) -> usize {
        self.remove_where(|entry| &entry.pool == pool)
    }

    /// Cancels everything.
    pub fn cancel_all(&mut self) -> usize {
        let removed = self.pending.len();
        self.pending.clear();
        removed
    }

    /// Shortest time left before `handle` in `pool` is released.
    #[must_use]
    pub fn remaining(&self, pool: &PoolName, handle: EntityHandle) -> Option<Duration> {
        self.pending
            .iter()
            .filter(|entry| &entry.pool == pool && entry.handle == handle)
            .map(|entry| entry.remaining)
            .min()
    }

    /// Iterates over pending entries in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingRelease> {
        self.pending.iter()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn remove_where(&mut self, predicate: impl Fn(&PendingRelease) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|entry| !predicate(entry));
        before - self.pending.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal target: generation per handle plus a release log.
    #[derive(Debug, Default)]
    struct FakeTarget {
        generations: HashMap<EntityHandle, Generation>,
        released: Vec<EntityHandle>,
    }

    impl ReleaseTarget for FakeTarget {
        fn current_generation(&self, _pool: &PoolName, handle: EntityHandle) -> Option<Generation> {
            self.generations.get(&handle).copied()
        }

        fn release_expired(&mut self, _pool: &PoolName, handle: EntityHandle) -> bool {
            self.released.push(handle);
            true
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn setup() -> (DelayedReleaseScheduler, FakeTarget, PoolName) {
        let mut target = FakeTarget::default();
        target
            .generations
            .insert(EntityHandle::new(0), Generation::ZERO.next());
        target
            .generations
            .insert(EntityHandle::new(1), Generation::ZERO.next());
        (DelayedReleaseScheduler::new(), target, PoolName::from("Bullets"))
    }

    #[test]
    fn fires_once_when_due() {
        let (mut scheduler, mut target, pool) = setup();
        let handle = EntityHandle::new(0);
        scheduler.schedule(pool.clone(), handle, Generation::ZERO.next(), ms(2000));

        assert!(scheduler.advance(ms(1500), &mut target).is_empty());
        assert_eq!(scheduler.remaining(&pool, handle), Some(ms(500)));

        let fired = scheduler.advance(ms(600), &mut target);
        assert_eq!(fired.len(), 1);
        assert_eq!(target.released, vec![handle]);
        assert!(scheduler.is_empty());

        assert!(scheduler.advance(ms(5000), &mut target).is_empty());
        assert_eq!(target.released.len(), 1);
    }

    #[test]
    fn stale_generation_is_dropped() {
        let (mut scheduler, mut target, pool) = setup();
        let handle = EntityHandle::new(0);
        scheduler.schedule(pool, handle, Generation::ZERO.next(), ms(100));

        target
            .generations
            .insert(handle, Generation::ZERO.next().next());

        let fired = scheduler.advance(ms(200), &mut target);
        assert!(fired.is_empty());
        assert!(target.released.is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn missing_slot_is_dropped() {
        let (mut scheduler, mut target, pool) = setup();
        scheduler.schedule(pool, EntityHandle::new(9), Generation::ZERO, ms(0));
        assert!(scheduler.advance(Duration::ZERO, &mut target).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn due_entries_fire_in_schedule_order() {
        let (mut scheduler, mut target, pool) = setup();
        let a = EntityHandle::new(0);
        let b = EntityHandle::new(1);
        scheduler.schedule(pool.clone(), b, Generation::ZERO.next(), ms(30));
        scheduler.schedule(pool, a, Generation::ZERO.next(), ms(10));

        let _ = scheduler.advance(ms(50), &mut target);
        assert_eq!(target.released, vec![b, a]);
    }

    #[test]
    fn cancel_removes_matching_entries() {
        let (mut scheduler, mut target, pool) = setup();
        let a = EntityHandle::new(0);
        let b = EntityHandle::new(1);
        scheduler.schedule(pool.clone(), a, Generation::ZERO.next(), ms(10));
        scheduler.schedule(pool.clone(), a, Generation::ZERO.next(), ms(20));
        scheduler.schedule(pool.clone(), b, Generation::ZERO.next(), ms(10));

        assert_eq!(scheduler.cancel(&pool, a), 2);
        assert_eq!(scheduler.len(), 1);

        let _ = scheduler.advance(ms(100), &mut target);
        assert_eq!(target.released, vec![b]);
    }

    #[test]
    fn cancel_pool_and_all() {
        let (mut scheduler, _target, pool) = setup();
        let other = PoolName::from("Enemies");
        scheduler.schedule(pool.clone(), EntityHandle::new(0), Generation::ZERO, ms(10));
        scheduler.schedule(other.clone(), EntityHandle::new(0), Generation::ZERO, ms(10));
        scheduler.schedule(other, EntityHandle::new(1), Generation::ZERO, ms(10));

        assert_eq!(scheduler.cancel_pool(&pool), 1);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.is_empty());
    }
}
