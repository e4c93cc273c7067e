//! # poolbus
//!
//! Bounded object pools with timed release and a type-keyed event bus for
//! tick-driven simulations.
//!
//! Frequently spawned entities (bullets, sparks, enemies) are recycled
//! through named [`domain::ObjectPool`]s instead of being allocated and
//! dropped every frame. Independent systems talk through a synchronous
//! [`domain::EventBus`] keyed by event type. Both live in a
//! [`service::Session`] that is created when a scene starts and torn down
//! when it ends; there is no global state.
//!
//! ## Architecture
//!
//! ```text
//! Gameplay systems (movement, scoring, HUD, ...)
//!     │
//!     ├── Session (service/)
//!     │     ├── PoolRegistry (domain/)
//!     │     │     ├── ObjectPool<T: Poolable> × N
//!     │     │     └── DelayedReleaseScheduler
//!     │     └── EventBus (domain/)
//!     │
//!     └── SessionConfig (config)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//!
//! use poolbus::config::SessionConfig;
//! use poolbus::domain::{EntityDespawned, PoolConfig, Poolable};
//! use poolbus::service::Session;
//!
//! #[derive(Debug, Default)]
//! struct Bullet {
//!     x: f32,
//! }
//!
//! impl Poolable for Bullet {
//!     type Params = f32;
//!
//!     fn on_acquire(&mut self, x: &f32) {
//!         self.x = *x;
//!     }
//! }
//!
//! let mut session: Session<Bullet> = Session::begin(SessionConfig::default());
//! session
//!     .create_pool_with("Bullets", Box::new(|| Ok(Bullet::default())), PoolConfig::new(4, 8, false))
//!     .ok();
//! session.events().subscribe(|e: &EntityDespawned| {
//!     println!("{} returned to {}", e.handle, e.pool);
//!     Ok(())
//! });
//!
//! if let Some(bullet) = session.spawn("Bullets", &1.5) {
//!     session.despawn_after_delay("Bullets", bullet, Duration::from_secs(2));
//! }
//! session.tick(Duration::from_secs(3));
//! assert_eq!(session.get_stats("Bullets"), "Bullets: 4/4 (8)");
//! session.end();
//! ```

pub mod config;
pub mod demo;
pub mod domain;
pub mod error;
pub mod service;
