// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Thermion.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod config;
mod sim;

use anyhow::Result;
use bevy_app::{ScheduleRunnerPlugin, TaskPoolPlugin, prelude::*};
use std::{sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use sim::{SimulatedHeatPump, SyntheticWeatherSource};
use thermion_core::{
    AsyncRuntime, CommanderResource, EngineState, ForecastSource, ForecastSourceResource,
    HistoryPersistence, HistoryPersistenceResource, SetpointCommander, ShutdownChannel,
    StatusSource, StatusSourceResource, ThermionCorePlugin,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // Handle command line arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("Thermion - Predictive Heat Pump Control");
                println!("Version: {VERSION}");
                println!();
                println!("Usage: thermion [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{VERSION}");
                return Ok(());
            }
            _ => {
                // Continue to normal execution for unknown args
            }
        }
    }

    // Create tokio runtime for the async collaborator tasks
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    // Run the ECS app in a blocking task so tokio can keep running async tasks
    runtime.block_on(async {
        tokio::task::spawn_blocking(initialize_and_run)
            .await
            .expect("App task panicked")
    })
}

fn initialize_and_run() -> Result<()> {
    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // Load and validate configuration (invalid ranges are fatal here)
    let config = config::load_config()?;

    info!("🚀 Starting Thermion - Predictive Heat Pump Control");
    info!("📋 Configuration Summary:");
    info!(
        "   Comfort: {}°C day / {}°C night setback",
        config.house.target_temperature, config.house.night_setback
    );
    info!(
        "   Building: {} mass, {} heating",
        config.house.building_thermal_mass, config.house.heating_system_type
    );
    info!(
        "   Engine: lag {}h, solar {}, wind {}, horizon {}h",
        config.advanced.thermal_lag_hours,
        config.advanced.solar_gain_factor,
        config.advanced.wind_factor,
        config.advanced.prediction_horizon_hours
    );
    info!(
        "   Cycle interval: {}s (cooldown {}s)",
        config.system.update_interval_secs, config.system.cooldown_secs
    );
    info!("   Learning data: {}", config.system.data_path);

    // Simulation collaborators: the controller runs end-to-end without a
    // broker or a weather API key. The same plant instance serves as both
    // telemetry source and setpoint commander.
    let plant = SimulatedHeatPump::new(
        config.house.target_temperature - config.house.night_setback,
        config.house.target_temperature,
        8.5,
    );
    let status_source: Arc<dyn StatusSource> = Arc::new(plant.clone());
    let commander: Arc<dyn SetpointCommander> = Arc::new(plant);
    let forecast_source: Arc<dyn ForecastSource> = Arc::new(SyntheticWeatherSource::new(
        config.advanced.prediction_horizon_hours,
    ));
    info!("🔌 Status source: {}", status_source.name());
    info!("🌦 Forecast source: {}", forecast_source.name());

    let persistence = HistoryPersistence::new(&config.system.data_path);

    // Wire SIGINT to the shutdown channel so the engine can flush its
    // learning data before the process leaves.
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let runtime_handle = tokio::runtime::Handle::current();
    runtime_handle.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    let engine_state = EngineState::from_config(&config);

    // Create the headless app
    info!("🎮 Starting control application...");

    let mut app = App::new();
    app
        // Add TaskPoolPlugin to initialize async task pools
        .add_plugins(TaskPoolPlugin::default())
        // Add ScheduleRunnerPlugin for headless operation
        .add_plugins(ScheduleRunnerPlugin::run_loop(Duration::from_millis(100)))
        .add_plugins(ThermionCorePlugin)
        .insert_resource(config)
        .insert_resource(engine_state)
        .insert_resource(AsyncRuntime::new())
        .insert_resource(StatusSourceResource(status_source))
        .insert_resource(ForecastSourceResource(forecast_source))
        .insert_resource(CommanderResource(commander))
        .insert_resource(HistoryPersistenceResource(persistence))
        .insert_resource(ShutdownChannel {
            receiver: shutdown_rx,
        });

    info!("✅ Starting main loop...");

    // Run the app with the built-in runner; the shutdown system exits the
    // process after flushing state.
    app.run();

    Ok(())
}
