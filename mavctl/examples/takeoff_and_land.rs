//! Takes off, prints a few telemetry snapshots and lands.
//!
//! Usage: `cargo run --example takeoff_and_land -- [ENDPOINT] [ALTITUDE]`
//!
//! Defaults to `tcp:127.0.0.1:5760` (ArduPilot SITL) and 10 meters.

use std::time::Duration;

use mavctl::io::mavlink::MavlinkConnector;
use mavctl::prelude::*;
use mavctl::session::Session;

const DEFAULT_ENDPOINT: &str = "tcp:127.0.0.1:5760";
const DEFAULT_ALTITUDE: f64 = 10.0;
const N_TELEMETRY: usize = 5;

fn run(endpoint: &str, altitude: f64) -> Result<()> {
    let session = Session::builder()
        .handshake_timeout(Duration::from_secs(30))
        .connect(endpoint, &MavlinkConnector::new())?;
    log::info!("[example] connected to {}", session.target());

    session.takeoff(altitude)?;

    for _ in 0..N_TELEMETRY {
        match session.telemetry()? {
            Some(snapshot) => {
                for (metric, value) in snapshot.iter() {
                    log::info!("[example] {metric}: {value:.3}");
                }
            }
            None => log::warn!("[example] no telemetry"),
        }
    }

    session.land()?;
    log::info!("[example] landing");

    Ok(())
}

fn main() {
    // Setup logger
    env_logger::builder()
        .filter_level(log::LevelFilter::Info) // Suppress everything below `info` for third-party modules.
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Debug) // Allow everything from current package
        .init();

    let mut args = std::env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let altitude = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_ALTITUDE);

    if let Err(err) = run(&endpoint, altitude) {
        log::error!("[example] {err}");
        std::process::exit(1);
    }
}
