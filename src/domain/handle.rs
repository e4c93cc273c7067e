//! Entity handles and generation counters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to one slot of an [`super::ObjectPool`].
///
/// Handles are `Copy` and stay valid for the lifetime of the slot; the
/// slot's occupant changes every time it is acquired, which is tracked by
/// its [`Generation`]. A handle is only meaningful together with the pool
/// that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(usize);

impl EntityHandle {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the slot index inside the issuing pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic per-slot counter, bumped on every acquire.
///
/// Two observations of the same handle with equal generations refer to
/// the same occupant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Generation of a slot that has never been acquired.
    pub const ZERO: Self = Self(0);

    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the following generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}
