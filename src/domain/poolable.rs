//! Lifecycle hooks for pooled entity types.

/// Capability implemented by types stored in an [`super::ObjectPool`].
///
/// Every hook has a no-op default, so a type opts into exactly the hooks
/// it cares about:
///
/// ```
/// use poolbus::domain::Poolable;
///
/// #[derive(Debug, Default)]
/// struct Spark {
///     ttl: f32,
/// }
///
/// impl Poolable for Spark {
///     type Params = f32;
///
///     fn on_acquire(&mut self, ttl: &f32) {
///         self.ttl = *ttl;
///     }
/// }
/// ```
///
/// Call order for one slot is `on_create` once, then any number of
/// `on_acquire` → (`on_release` → `reset`) cycles.
pub trait Poolable {
    /// Placement and ownership context handed over on every spawn.
    type Params;

    /// Runs exactly once, right after the factory produced the entity.
    fn on_create(&mut self) {}

    /// Runs on every free → in-use transition.
    fn on_acquire(&mut self, _params: &Self::Params) {}

    /// Runs on every in-use → free transition.
    fn on_release(&mut self) {}

    /// Clears transient state (attached context, motion) after
    /// [`Poolable::on_release`].
    fn reset(&mut self) {}
}
