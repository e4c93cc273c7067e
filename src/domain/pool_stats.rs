//! Occupancy snapshot of a pool.

use std::fmt;

use serde::Serialize;

use super::PoolName;

/// Point-in-time view of one pool's occupancy.
///
/// `Display` renders the compact `"name: free/total (max)"` form used in
/// debug overlays and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Pool name.
    pub name: PoolName,
    /// Entities waiting in the free queue.
    pub free: usize,
    /// Entities currently handed out.
    pub in_use: usize,
    /// Entities the pool owns.
    pub total: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Whether the pool may grow past `max_size`.
    pub auto_expand: bool,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} ({})",
            self.name, self.free, self.total, self.max_size
        )
    }
}
