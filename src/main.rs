use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use weather_station::{
    AnySink, Cadence, StationConfig, SystemClock, WeatherStation, sim, spawn_station,
};

#[derive(Parser, Debug)]
#[command(name = "weather-station")]
#[command(about = "Weather station telemetry aggregator")]
struct Args {
    /// Drive the engine from simulated sensors instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Load configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Close a single window, print its snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| "weather_station=debug".into()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match &args.config {
        Some(path) => StationConfig::load_from(path),
        None => StationConfig::load(),
    }
    .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    if !args.simulate {
        anyhow::bail!(
            "No sensor hardware backend is available on this platform. Run with --simulate"
        );
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(run_daemon(config, args.once))
}

/// Wire the station to simulated sensors and the configured sink, then run
/// until interrupted (or for one window with `--once`).
async fn run_daemon(config: StationConfig, once: bool) -> Result<()> {
    tracing::info!("Starting weather station in simulation mode");
    tracing::info!(
        "Units: temperature {:?}, wind {:?}, rain {:?}",
        config.units.temperature,
        config.units.wind_speed,
        config.units.rain
    );
    tracing::info!(
        "Sampling every {}s, publishing every {:?} ({:.1} updates per hour)",
        config.windows.sample_interval_secs,
        config.windows.window(),
        config.windows.updates_per_hour()
    );

    let station = Arc::new(WeatherStation::new(config.units));
    let clock = Arc::new(SystemClock::default());
    let sink = Arc::new(AnySink::from_config(&config.publish)?);
    match &config.publish.endpoint {
        Some(url) => tracing::info!("Publishing snapshots to {}", url),
        None => tracing::info!("No endpoint configured, snapshots go to the log"),
    }

    let inputs = station.pulse_inputs();
    let generators: Vec<_> = [
        sim::spawn_wind_pulses(inputs.clone(), Arc::clone(&clock), config.simulation.wind_kmh),
        sim::spawn_rain_tips(
            inputs,
            Duration::from_secs(config.simulation.rain_tip_interval_secs),
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut tasks = spawn_station(
        Arc::clone(&station),
        sim::SimulatedSensors::default(),
        sink,
        clock,
        Cadence::from(&config.windows),
    );

    if once {
        let snapshot = tasks
            .next_snapshot()
            .await
            .context("Station stopped before a window closed")?;
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
        println!("{json}");
    } else {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        tracing::info!("Shutting down");
    }

    tasks.shutdown();
    for generator in generators {
        generator.abort();
    }
    Ok(())
}
