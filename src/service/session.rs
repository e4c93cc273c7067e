//! Session service: owns the pools and the bus for one play session.

use std::rc::Rc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::domain::{
    DespawnCause, EntityDespawned, EntityHandle, EntitySpawned, EventBus, Factory, PoolConfig,
    PoolName, PoolRegistry, Poolable, SessionId, SpawnFailed,
};
use crate::error::PoolError;

/// Explicit context for one simulation session.
///
/// Built with [`Session::begin`] when a scene starts and consumed by
/// [`Session::end`] when it stops. Gameplay systems receive the session
/// (or its [`EventBus`]) instead of reaching for global state. Every
/// spawn/despawn that goes through the session is mirrored on the bus as
/// [`EntitySpawned`], [`EntityDespawned`] or [`SpawnFailed`], unless
/// [`SessionConfig::publish_pool_events`] is off.
#[derive(Debug)]
pub struct Session<T: Poolable> {
    id: SessionId,
    config: SessionConfig,
    registry: PoolRegistry<T>,
    events: Rc<EventBus>,
    elapsed: Duration,
    ticks: u64,
}

impl<T: Poolable> Session<T> {
    /// Starts a session with an empty registry and bus.
    #[must_use]
    pub fn begin(config: SessionConfig) -> Self {
        let id = SessionId::new();
        tracing::info!(session = %id, "session started");
        Self {
            id,
            config,
            registry: PoolRegistry::new(),
            events: Rc::new(EventBus::new()),
            elapsed: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Creates a pool sized by the session's default [`PoolConfig`].
    ///
    /// # Errors
    ///
    /// See [`PoolRegistry::create_pool`].
    pub fn create_pool(
        &mut self,
        name: impl Into<PoolName>,
        factory: Factory<T>,
    ) -> Result<(), PoolError> {
        let config = self.config.default_pool;
        self.registry.create_pool(name, factory, config)
    }

    /// Creates a pool with an explicit [`PoolConfig`].
    ///
    /// # Errors
    ///
    /// See [`PoolRegistry::create_pool`].
    pub fn create_pool_with(
        &mut self,
        name: impl Into<PoolName>,
        factory: Factory<T>,
        config: PoolConfig,
    ) -> Result<(), PoolError> {
        self.registry.create_pool(name, factory, config)
    }

    /// Spawns from `name` and announces the outcome on the bus.
    pub fn spawn(&mut self, name: &str, params: &T::Params) -> Option<EntityHandle> {
        match self.registry.try_spawn(name, params) {
            Ok(handle) => {
                if self.config.publish_pool_events {
                    let generation = self
                        .registry
                        .pool(name)
                        .and_then(|pool| pool.generation(handle))
                        .unwrap_or_default();
                    self.events.publish(&EntitySpawned {
                        pool: PoolName::from(name),
                        handle,
                        generation,
                    });
                }
                Some(handle)
            }
            Err(err) => {
                tracing::warn!(session = %self.id, pool = name, kind = err.kind(), error = %err, "spawn failed");
                if self.config.publish_pool_events {
                    self.events.publish(&SpawnFailed {
                        pool: PoolName::from(name),
                        reason: err.kind(),
                    });
                }
                None
            }
        }
    }

    /// Despawns `handle` and announces it if something was released.
    pub fn despawn(&mut self, name: &str, handle: EntityHandle) -> bool {
        let released = self.registry.despawn(name, handle);
        if released && self.config.publish_pool_events {
            self.events.publish(&EntityDespawned {
                pool: PoolName::from(name),
                handle,
                cause: DespawnCause::Manual,
            });
        }
        released
    }

    /// Schedules `handle` to despawn after `delay`.
    pub fn despawn_after_delay(&mut self, name: &str, handle: EntityHandle, delay: Duration) -> bool {
        self.registry.despawn_after_delay(name, handle, delay)
    }

    /// Advances the session clock by `dt` and fires due delayed despawns.
    ///
    /// Returns how many entities were released by timers this tick.
    pub fn tick(&mut self, dt: Duration) -> usize {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.ticks = self.ticks.saturating_add(1);

        let fired = self.registry.tick(dt);
        if self.config.publish_pool_events {
            for entry in &fired {
                self.events.publish(&EntityDespawned {
                    pool: entry.pool.clone(),
                    handle: entry.handle,
                    cause: DespawnCause::Expired,
                });
            }
        }
        fired.len()
    }

    /// Returns `"name: free/total (max)"` for pool `name`.
    #[must_use]
    pub fn get_stats(&self, name: &str) -> String {
        self.registry.get_stats(name)
    }

    /// Returns the bus shared by every system of this session.
    #[must_use]
    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    /// Returns the pool registry.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry<T> {
        &self.registry
    }

    /// Returns the pool registry mutably. Operations performed directly on
    /// it are not announced on the bus.
    pub fn registry_mut(&mut self) -> &mut PoolRegistry<T> {
        &mut self.registry
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the configuration the session was started with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Simulated time accumulated through [`Session::tick`].
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Tears the session down: destroys every pooled entity, cancels
    /// pending delayed despawns and drops every subscription.
    pub fn end(mut self) {
        self.registry.clear_all();
        self.events.clear();
        tracing::info!(
            session = %self.id,
            ticks = self.ticks,
            elapsed_ms = u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            "session ended"
        );
    }
}
