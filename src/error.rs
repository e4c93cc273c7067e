//! Pool error types.
//!
//! [`PoolError`] is the central error type for pool and registry
//! operations. Every variant is locally recoverable: callers treat a
//! failed spawn as "nothing spawned this tick", never as a crash.

use crate::domain::{EntityHandle, PoolName};

/// Errors produced by [`crate::domain::ObjectPool`] and
/// [`crate::domain::PoolRegistry`].
///
/// # Categories
///
/// | Variant                 | Meaning                                      |
/// |-------------------------|----------------------------------------------|
/// | `PoolNotFound`          | operation referenced an unregistered name    |
/// | `Exhausted`             | at capacity with auto-expand disabled        |
/// | `DuplicateRegistration` | `create_pool` called twice for one name      |
/// | `FactoryFailed`         | the entity factory returned an error         |
/// | `InvalidConfig`         | pool configuration cannot hold any entity    |
/// | `Corrupted`             | free queue referenced a slot that is gone    |
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No pool is registered under the given name.
    #[error("pool not found: {0}")]
    PoolNotFound(PoolName),

    /// The pool has no free entity and may not grow.
    #[error("pool {pool} exhausted (max {max_size})")]
    Exhausted {
        /// Pool that ran out of entities.
        pool: PoolName,
        /// Configured capacity.
        max_size: usize,
    },

    /// A pool with the same name already exists.
    #[error("pool {0} already exists")]
    DuplicateRegistration(PoolName),

    /// The factory could not produce an entity.
    #[error("factory for pool {pool} failed: {source}")]
    FactoryFailed {
        /// Pool whose factory failed.
        pool: PoolName,
        /// Underlying factory error.
        #[source]
        source: anyhow::Error,
    },

    /// Pool configuration rejected at creation time.
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),

    /// The free queue held a handle with no backing slot. Not reachable
    /// through the public API.
    #[error("pool {pool} free queue referenced missing slot {handle}")]
    Corrupted {
        /// Pool whose bookkeeping broke.
        pool: PoolName,
        /// Dangling handle that was discarded.
        handle: EntityHandle,
    },
}

impl PoolError {
    /// Returns a short, stable label for this variant, used as a
    /// structured log field and in [`crate::domain::SpawnFailed`] events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PoolNotFound(_) => "not_found",
            Self::Exhausted { .. } => "exhausted",
            Self::DuplicateRegistration(_) => "duplicate_registration",
            Self::FactoryFailed { .. } => "factory_failed",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Corrupted { .. } => "corrupted",
        }
    }

    /// Returns `true` for outcomes that are part of normal operation
    /// rather than a misconfiguration.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
