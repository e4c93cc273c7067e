//! poolbus demo entry point.
//!
//! Runs the headless projectile simulation and prints the final report as
//! JSON on stdout.

use tracing_subscriber::EnvFilter;

use poolbus::config::SessionConfig;
use poolbus::demo;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = SessionConfig::from_env();
    tracing::info!(
        ticks = config.ticks,
        tick_ms = u64::try_from(config.tick.as_millis()).unwrap_or(u64::MAX),
        "starting simulation"
    );

    let report = demo::run(config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
