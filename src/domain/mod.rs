//! Domain layer: pools, handles, delayed release and the event bus.
//!
//! This module contains the reusable-entity model (pool names, handles
//! with generation counters, the [`Poolable`] hooks, object pools and the
//! registry over them), the tick-driven release scheduler, and the
//! type-keyed event bus together with the pool lifecycle events it
//! carries.

pub mod event_bus;
pub mod handle;
pub mod object_pool;
pub mod pool_event;
pub mod pool_name;
pub mod pool_registry;
pub mod pool_stats;
pub mod poolable;
pub mod scheduler;
pub mod session_id;

pub use event_bus::{EventBus, ListenerId};
pub use handle::{EntityHandle, Generation};
pub use object_pool::{Factory, ObjectPool, PoolConfig};
pub use pool_event::{DespawnCause, EntityDespawned, EntitySpawned, SpawnFailed};
pub use pool_name::PoolName;
pub use pool_registry::PoolRegistry;
pub use pool_stats::PoolStats;
pub use poolable::Poolable;
pub use scheduler::{DelayedReleaseScheduler, PendingRelease, ReleaseTarget};
pub use session_id::SessionId;
