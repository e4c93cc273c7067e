//! Headless projectile simulation driving a [`Session`].
//!
//! A turret fires a bullet every few ticks. Bullets fly right, expire
//! after a fixed lifetime through a delayed despawn, or are despawned
//! manually when they cross the wall, which also spawns an impact spark
//! and publishes a [`WallHit`]. A score listener and counters subscribe to
//! the bus; none of them knows about the registry.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::config::SessionConfig;
use crate::domain::{
    DespawnCause, EntityDespawned, EntityHandle, EntitySpawned, Factory, PoolConfig, PoolStats,
    Poolable, SpawnFailed,
};
use crate::error::PoolError;
use crate::service::Session;

/// Pool holding bullets.
pub const BULLETS: &str = "Bullets";
/// Pool holding impact sparks.
pub const SPARKS: &str = "Sparks";

const WALL_X: f32 = 12.0;
const BULLET_SPEED: f32 = 10.0;
const BULLET_LIFETIME: Duration = Duration::from_millis(1500);
const SPARK_LIFETIME: Duration = Duration::from_millis(250);
const FIRE_EVERY: u32 = 5;

/// Placement handed to a projectile on spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    /// Starting position.
    pub position: (f32, f32),
    /// Velocity in units per second.
    pub velocity: (f32, f32),
}

/// Pooled projectile.
#[derive(Debug, Default)]
pub struct Projectile {
    position: (f32, f32),
    velocity: (f32, f32),
    launches: u32,
}

impl Projectile {
    /// Current position.
    #[must_use]
    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    /// How many times this instance has been reused.
    #[must_use]
    pub fn launches(&self) -> u32 {
        self.launches
    }

    fn step(&mut self, dt: f32) {
        self.position.0 += self.velocity.0 * dt;
        self.position.1 += self.velocity.1 * dt;
    }
}

impl Poolable for Projectile {
    type Params = Launch;

    fn on_acquire(&mut self, launch: &Launch) {
        self.position = launch.position;
        self.velocity = launch.velocity;
        self.launches += 1;
    }

    fn reset(&mut self) {
        self.velocity = (0.0, 0.0);
    }
}

/// Published when a bullet reaches the wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WallHit {
    /// Bullet that hit.
    pub handle: EntityHandle,
    /// Impact height.
    pub y: f32,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Ticks simulated.
    pub ticks: u32,
    /// Successful spawns across all pools.
    pub spawned: u32,
    /// Spawns refused by a pool.
    pub failed_spawns: u32,
    /// Entities returned by gameplay code.
    pub manual_despawns: u32,
    /// Entities returned by timers.
    pub expired: u32,
    /// Score accumulated from wall hits.
    pub score: u32,
    /// Final occupancy of every pool.
    pub pools: Vec<PoolStats>,
}

fn projectile_factory() -> Factory<Projectile> {
    Box::new(|| Ok(Projectile::default()))
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn bump(cell: &Cell<u32>) {
    cell.set(cell.get().saturating_add(1));
}

/// Runs the simulation for `config.ticks` steps of `config.tick`.
///
/// # Errors
///
/// Returns a [`PoolError`] if a pool cannot be created.
pub fn run(config: SessionConfig) -> Result<SimulationReport, PoolError> {
    let mut session: Session<Projectile> = Session::begin(config);
    session.create_pool_with(BULLETS, projectile_factory(), PoolConfig::new(8, 16, false))?;
    session.create_pool_with(SPARKS, projectile_factory(), PoolConfig::new(2, 4, true))?;

    let spawned = counter();
    let failed = counter();
    let manual = counter();
    let expired = counter();
    let score = counter();

    let bus = Rc::clone(session.events());
    let sink = Rc::clone(&spawned);
    bus.subscribe(move |_: &EntitySpawned| {
        bump(&sink);
        Ok(())
    });
    let sink = Rc::clone(&failed);
    bus.subscribe(move |_: &SpawnFailed| {
        bump(&sink);
        Ok(())
    });
    let (manual_sink, expired_sink) = (Rc::clone(&manual), Rc::clone(&expired));
    bus.subscribe(move |event: &EntityDespawned| {
        match event.cause {
            DespawnCause::Manual => bump(&manual_sink),
            DespawnCause::Expired => bump(&expired_sink),
        }
        Ok(())
    });
    let sink = Rc::clone(&score);
    bus.subscribe(move |hit: &WallHit| {
        let points = if hit.y.abs() < 1.0 { 3 } else { 1 };
        sink.set(sink.get().saturating_add(points));
        Ok(())
    });

    let dt = session.config().tick;
    let ticks = session.config().ticks;
    for tick in 0..ticks {
        if tick % FIRE_EVERY == 0 {
            fire(&mut session, tick);
        }

        let hits = advance_bullets(&mut session, dt.as_secs_f32());
        for hit in hits {
            if session.despawn(BULLETS, hit.handle) {
                bus.publish(&hit);
                let spark = Launch {
                    position: (WALL_X, hit.y),
                    velocity: (0.0, 0.0),
                };
                if let Some(handle) = session.spawn(SPARKS, &spark) {
                    session.despawn_after_delay(SPARKS, handle, SPARK_LIFETIME);
                }
            }
        }

        session.tick(dt);
    }

    let report = SimulationReport {
        ticks,
        spawned: spawned.get(),
        failed_spawns: failed.get(),
        manual_despawns: manual.get(),
        expired: expired.get(),
        score: score.get(),
        pools: session.registry().all_stats(),
    };
    tracing::info!(
        spawned = report.spawned,
        failed = report.failed_spawns,
        score = report.score,
        "simulation finished"
    );
    session.end();
    Ok(report)
}

fn fire(session: &mut Session<Projectile>, tick: u32) {
    // Lanes below zero fly at half speed and expire short of the wall.
    let lane = f32::from(u8::try_from(tick / FIRE_EVERY % 5).unwrap_or(0)) - 2.0;
    let speed = if lane < 0.0 { BULLET_SPEED * 0.5 } else { BULLET_SPEED };
    let launch = Launch {
        position: (0.0, lane),
        velocity: (speed, 0.0),
    };
    if let Some(handle) = session.spawn(BULLETS, &launch) {
        session.despawn_after_delay(BULLETS, handle, BULLET_LIFETIME);
    }
}

fn advance_bullets(session: &mut Session<Projectile>, dt: f32) -> Vec<WallHit> {
    let Some(pool) = session.registry_mut().pool_mut(BULLETS) else {
        return Vec::new();
    };
    let mut hits = Vec::new();
    for (handle, bullet) in pool.iter_in_use_mut() {
        bullet.step(dt);
        if bullet.position.0 >= WALL_X {
            hits.push(WallHit {
                handle,
                y: bullet.position.1,
            });
        }
    }
    hits
}
