//! Headless engine for the Loadgate transfer controller.
//!
//! Runs one agent's [`TransferController`] through a YAML scenario: a
//! vehicle, the depots and discharge points around it, a looping route,
//! rival agents draining the same depots, and scheduled operator commands.
//! An observer mirrors the replicated state the whole time. At the end a
//! JSON run summary is printed to stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `loadgate-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the scenario (first argument, or `loadgate-scenario.yaml`)
//! 4. Build the world, the route driver, and the controller
//! 5. Run the tick loop
//! 6. Stop the controller and print the summary
//!
//! [`TransferController`]: loadgate_core::TransferController

mod driver;
mod error;
mod scenario;
mod sim;
mod world;

use std::path::{Path, PathBuf};

use loadgate_core::config::{ControllerConfig, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scenario::Scenario;
use crate::sim::Simulation;

/// Default scenario file, relative to the working directory.
const DEFAULT_SCENARIO: &str = "loadgate-scenario.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration or the scenario cannot be loaded,
/// or if the observer rejects a replicated state.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration first so its log level can seed the filter.
    let config = load_config()?;
    init_tracing(&config.logging);

    info!("loadgate-engine starting");
    info!(
        loading_enabled = config.loading.enabled,
        require_alternation = config.loading.require_alternation,
        unloading_enabled = config.unloading.enabled,
        hold_waypoint_offset = config.manual_override.hold_waypoint_offset,
        "Configuration loaded"
    );

    let scenario_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_SCENARIO), PathBuf::from);
    let scenario = Scenario::from_file(&scenario_path)?;
    info!(
        path = %scenario_path.display(),
        ticks = scenario.ticks,
        vehicles = scenario.vehicles.len(),
        depots = scenario.depots.len(),
        discharge_points = scenario.discharge_points.len(),
        rivals = scenario.rivals.count,
        "Scenario loaded"
    );

    let mut sim = Simulation::new(config, &scenario)?;
    sim.start()?;
    for _ in 0..scenario.ticks {
        sim.step()?;
    }
    let summary = sim.finish()?;

    let json = serde_json::to_string_pretty(&summary).map_err(|e| EngineError::Summary {
        message: format!("{e}"),
    })?;
    println!("{json}");

    info!(
        ticks = summary.ticks,
        final_state = %summary.final_state,
        "loadgate-engine finished"
    );
    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the controller configuration from `loadgate-config.yaml`.
///
/// Searches for the config file relative to the current working directory.
/// Falls back to defaults if the file is not found.
fn load_config() -> Result<ControllerConfig, EngineError> {
    let config_path = Path::new("loadgate-config.yaml");
    if config_path.exists() {
        let config = ControllerConfig::from_file(config_path)?;
        Ok(config)
    } else {
        let mut config = ControllerConfig::default();
        config.logging.apply_env_overrides();
        Ok(config)
    }
}
