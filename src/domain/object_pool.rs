//! Bounded pool of reusable entities.
//!
//! [`ObjectPool`] owns every entity it ever created. Consumers only hold
//! [`EntityHandle`]s; the pool tracks which slots are free through a FIFO
//! queue so that the entity returned longest ago is reused first.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EntityHandle, Generation, PoolName, PoolStats, Poolable};
use crate::error::PoolError;

/// Entity constructor owned by a pool.
pub type Factory<T> = Box<dyn FnMut() -> anyhow::Result<T>>;

/// Sizing policy of a single pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Entities created eagerly when the pool is built.
    pub initial_size: usize,
    /// Upper bound on live entities unless `auto_expand` is set.
    pub max_size: usize,
    /// Allow growth past `max_size` instead of failing a spawn.
    pub auto_expand: bool,
}

impl PoolConfig {
    /// Creates a config with the given sizes.
    #[must_use]
    pub const fn new(initial_size: usize, max_size: usize, auto_expand: bool) -> Self {
        Self {
            initial_size,
            max_size,
            auto_expand,
        }
    }

    /// Checks that the config can ever hold an entity.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `max_size` is zero and the
    /// pool may not expand.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 && !self.auto_expand {
            return Err(PoolError::InvalidConfig(
                "max_size must be positive when auto_expand is disabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(10, 100, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    InUse,
}

#[derive(Debug)]
struct Slot<T> {
    entity: T,
    generation: Generation,
    state: SlotState,
}

/// A named collection of reusable entities of one kind.
///
/// # Invariants
///
/// - every handle in the free queue refers to an existing slot whose
///   state is free, and appears there exactly once;
/// - a slot is in the free queue iff it is not acquired;
/// - `len() <= max_size` unless the pool auto-expands;
/// - generations never repeat for a handle, even across [`clear`].
///
/// [`clear`]: ObjectPool::clear
pub struct ObjectPool<T: Poolable> {
    name: PoolName,
    factory: Factory<T>,
    slots: Vec<Slot<T>>,
    free: VecDeque<EntityHandle>,
    config: PoolConfig,
    /// Highest generation any slot has reached. New slots start here.
    high_water: Generation,
}

impl<T: Poolable> ObjectPool<T> {
    /// Builds a pool and pre-populates it with `config.initial_size`
    /// entities.
    ///
    /// When the pool may not expand, `initial_size` is clamped to
    /// `max_size`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] for an unusable config and
    /// [`PoolError::FactoryFailed`] if the factory fails during
    /// pre-population.
    pub fn create(
        name: PoolName,
        factory: Factory<T>,
        mut config: PoolConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        if !config.auto_expand && config.initial_size > config.max_size {
            tracing::warn!(
                pool = %name,
                initial_size = config.initial_size,
                max_size = config.max_size,
                "initial size exceeds max size; clamping"
            );
            config.initial_size = config.max_size;
        }

        let mut pool = Self {
            name,
            factory,
            slots: Vec::with_capacity(config.initial_size),
            free: VecDeque::with_capacity(config.initial_size),
            config,
            high_water: Generation::ZERO,
        };
        for _ in 0..config.initial_size {
            let handle = pool.grow()?;
            pool.free.push_back(handle);
        }
        Ok(pool)
    }

    /// Hands out a free entity, creating one if the pool may grow.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Exhausted`] when no entity is free and the pool
    /// is at capacity, or [`PoolError::FactoryFailed`] if growing failed.
    /// Neither leaves the pool modified. [`PoolError::Corrupted`] means the
    /// free queue pointed at a slot that does not exist; the dangling entry
    /// is discarded so the next call can proceed.
    pub fn acquire(&mut self, params: &T::Params) -> Result<EntityHandle, PoolError> {
        let handle = match self.free.pop_front() {
            Some(handle) => handle,
            None if self.can_grow() => self.grow()?,
            None => {
                return Err(PoolError::Exhausted {
                    pool: self.name.clone(),
                    max_size: self.config.max_size,
                });
            }
        };

        let Some(slot) = self.slots.get_mut(handle.index()) else {
            tracing::error!(pool = %self.name, %handle, "free queue referenced missing slot");
            return Err(PoolError::Corrupted {
                pool: self.name.clone(),
                handle,
            });
        };
        slot.generation = slot.generation.next();
        self.high_water = self.high_water.max(slot.generation);
        slot.state = SlotState::InUse;
        slot.entity.on_acquire(params);

        tracing::debug!(pool = %self.name, %handle, generation = %slot.generation, "acquired");
        Ok(handle)
    }

    /// Returns an entity to the free queue.
    ///
    /// Returns `false` without side effects when the handle is foreign or
    /// the entity is already free, so double releases are harmless.
    pub fn release(&mut self, handle: EntityHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            tracing::debug!(pool = %self.name, %handle, "release of unknown handle ignored");
            return false;
        };
        if slot.state == SlotState::Free {
            tracing::debug!(pool = %self.name, %handle, "release of free entity ignored");
            return false;
        }

        slot.entity.on_release();
        slot.entity.reset();
        slot.state = SlotState::Free;
        self.free.push_back(handle);

        tracing::debug!(pool = %self.name, %handle, "released");
        true
    }

    /// Releases every in-use entity, oldest slot first. Returns how many
    /// were released.
    pub fn release_all(&mut self) -> usize {
        let in_use: Vec<EntityHandle> = self.iter_in_use().map(|(handle, _)| handle).collect();
        in_use
            .into_iter()
            .filter(|handle| self.release(*handle))
            .count()
    }

    /// Destroys every entity, free or in use.
    ///
    /// Outstanding handles become unknown to the pool. Slots created
    /// afterwards continue from the highest generation seen so far, so a
    /// timer captured before the clear can never match a new occupant.
    pub fn clear(&mut self) {
        let destroyed = self.slots.len();
        self.slots.clear();
        self.free.clear();
        tracing::info!(pool = %self.name, destroyed, "pool cleared");
    }

    /// Returns the in-use entity behind `handle`.
    #[must_use]
    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.state == SlotState::InUse)
            .map(|slot| &slot.entity)
    }

    /// Returns the in-use entity behind `handle`, mutably.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.state == SlotState::InUse)
            .map(|slot| &mut slot.entity)
    }

    /// Returns `true` if `handle` is currently acquired.
    #[must_use]
    pub fn is_in_use(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Returns the current generation of `handle`'s slot, or `None` for a
    /// handle this pool does not know.
    #[must_use]
    pub fn generation(&self, handle: EntityHandle) -> Option<Generation> {
        self.slots.get(handle.index()).map(|slot| slot.generation)
    }

    /// Iterates over in-use entities in slot order.
    pub fn iter_in_use(&self) -> impl Iterator<Item = (EntityHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == SlotState::InUse)
            .map(|(index, slot)| (EntityHandle::new(index), &slot.entity))
    }

    /// Iterates mutably over in-use entities in slot order.
    pub fn iter_in_use_mut(&mut self) -> impl Iterator<Item = (EntityHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.state == SlotState::InUse)
            .map(|(index, slot)| (EntityHandle::new(index), &mut slot.entity))
    }

    /// Returns the pool name.
    #[must_use]
    pub fn name(&self) -> &PoolName {
        &self.name
    }

    /// Returns the sizing policy.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of entities waiting in the free queue.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Number of entities currently handed out.
    #[must_use]
    pub fn in_use_len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    /// Number of entities the pool owns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the pool owns no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns a snapshot of the pool's occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            free: self.free_len(),
            in_use: self.in_use_len(),
            total: self.len(),
            max_size: self.config.max_size,
            auto_expand: self.config.auto_expand,
        }
    }

    fn can_grow(&self) -> bool {
        self.config.auto_expand || self.slots.len() < self.config.max_size
    }

    /// Creates one free entity. The factory runs before any field is
    /// touched, so a failure leaves the pool as it was.
    fn grow(&mut self) -> Result<EntityHandle, PoolError> {
        let mut entity = (self.factory)().map_err(|source| {
            tracing::error!(pool = %self.name, error = %source, "factory failed");
            PoolError::FactoryFailed {
                pool: self.name.clone(),
                source,
            }
        })?;
        entity.on_create();

        let handle = EntityHandle::new(self.slots.len());
        self.slots.push(Slot {
            entity,
            generation: self.high_water,
            state: SlotState::Free,
        });
        if self.config.auto_expand && self.slots.len() > self.config.max_size {
            tracing::debug!(pool = %self.name, total = self.slots.len(), "pool expanded past max size");
        }
        Ok(handle)
    }

    #[cfg(test)]
    #[allow(clippy::panic)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = std::collections::HashSet::new();
        for handle in &self.free {
            assert!(seen.insert(*handle), "duplicate {handle} in free queue");
            let Some(slot) = self.slots.get(handle.index()) else {
                panic!("free queue holds unknown {handle}");
            };
            assert_eq!(slot.state, SlotState::Free, "{handle} queued while in use");
        }
        let free_slots = self
            .slots
            .iter()
            .filter(|slot| slot.state == SlotState::Free)
            .count();
        assert_eq!(free_slots, self.free.len(), "free slot missing from queue");
        if !self.config.auto_expand {
            assert!(self.slots.len() <= self.config.max_size);
        }
    }
}

impl<T: Poolable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.name)
            .field("free", &self.free.len())
            .field("total", &self.slots.len())
            .field("config", &self.config)
            .field("high_water", &self.high_water)
            .finish_non_exhaustive()
    }
}
