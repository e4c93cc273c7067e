//! Pool lifecycle events.
//!
//! [`crate::service::Session`] publishes these on its [`super::EventBus`]
//! after every spawn and despawn, so HUDs, audio and scoring can react
//! without holding a reference to the registry.

use serde::Serialize;

use super::{EntityHandle, Generation, PoolName};

/// Why an entity went back to its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DespawnCause {
    /// Gameplay code despawned it.
    Manual,
    /// A delayed despawn ran out.
    Expired,
}

/// Emitted after an entity was handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpawned {
    /// Pool the entity came from.
    pub pool: PoolName,
    /// Handle of the new occupant.
    pub handle: EntityHandle,
    /// Generation of the new occupant.
    pub generation: Generation,
}

/// Emitted after an entity was returned to its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDespawned {
    /// Pool the entity returned to.
    pub pool: PoolName,
    /// Handle that is free again.
    pub handle: EntityHandle,
    /// What triggered the despawn.
    pub cause: DespawnCause,
}

/// Emitted when a spawn request produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnFailed {
    /// Requested pool.
    pub pool: PoolName,
    /// Stable failure label, see [`crate::error::PoolError::kind`].
    pub reason: &'static str,
}
