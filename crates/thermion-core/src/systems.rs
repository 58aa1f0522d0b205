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

//! ECS systems wiring the engine into the headless app.
//!
//! Background workers poll the collaborators over channels; the control
//! cycle runs synchronously on the ECS thread at the configured interval;
//! retraining happens on a dedicated trainer thread and the finished
//! generation is swapped in whole.

use bevy_ecs::prelude::*;
use chrono::Utc;
use futures_timer::Delay;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::async_runtime::AsyncRuntime;
use crate::async_tasks::{ForecastChannel, ForecastPoller, StatusChannel, StatusPoller};
use crate::cycle::{algorithm_status, run_cycle};
use crate::learning::{LearningEngine, ModelRegistry};
use crate::persistence::PersistedLearningData;
use crate::resources::{
    CommandResultChannel, CommanderResource, CycleState, EngineState, ForecastSourceResource,
    HistoryPersistenceResource, LatestForecast, LatestStatus, ShutdownChannel,
    StatusSourceResource, TrainJob, TrainerState,
};
use thermion_types::AppConfig;

/// How often the status poller asks the telemetry source for a snapshot.
const STATUS_POLL_INTERVAL_SECS: u64 = 60;

/// Snapshots older than this draw a warning at cycle time.
const STALE_STATUS_WARN_SECS: i64 = 5 * 60;

/// Channel capacity for status snapshots (small buffer; newest wins anyway)
const STATUS_CHANNEL_CAPACITY: usize = 20;

/// Channel capacity for forecast updates
const FORECAST_CHANNEL_CAPACITY: usize = 20;

/// Create the trainer channels and spawn the dedicated trainer thread.
///
/// The fit is CPU-bound and can outlast a cycle budget, so it never runs on
/// the ECS thread; the cycle keeps reading the installed generation until a
/// complete replacement arrives.
pub fn spawn_trainer() -> TrainerState {
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<TrainJob>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<ModelRegistry>();

    // Detached on purpose: the thread lives for the whole process.
    let _ = std::thread::Builder::new()
        .name("model-trainer".to_string())
        .spawn(move || {
            info!("Model trainer thread started");
            while let Ok(job) = job_rx.recv() {
                let started = Instant::now();
                let registry =
                    ModelRegistry::train_all(&job.observations, &job.previous, Utc::now());
                debug!(
                    "Retrained on {} observations in {:?}",
                    job.observations.len(),
                    started.elapsed()
                );
                if result_tx.send(registry).is_err() {
                    break; // App side gone; nothing left to train for.
                }
            }
        })
        .expect("failed to spawn model trainer thread");

    TrainerState {
        job_tx,
        result_rx,
        in_flight: false,
        dirty: false,
    }
}

/// Startup system that spawns the long-running collaborator pollers.
/// They run in the background and communicate via channels.
pub fn setup_async_workers(
    mut commands: Commands,
    runtime: Res<AsyncRuntime>,
    status_source: Res<StatusSourceResource>,
    forecast_source: Res<ForecastSourceResource>,
    config: Res<AppConfig>,
) {
    // ============= Status Poller Worker =============

    let (status_tx, status_rx) = crossbeam_channel::bounded(STATUS_CHANNEL_CAPACITY);
    let source = status_source.0.clone();
    let source_name = source.name().to_string();

    runtime.spawn(async move {
        info!("Status poller worker started");
        loop {
            match source.read_status().await {
                Ok(status) => {
                    if let Err(e) = status_tx.try_send(status) {
                        warn!("Failed to send status to channel (buffer full?): {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to read heat pump status: {:#}", e);
                }
            }
            Delay::new(Duration::from_secs(STATUS_POLL_INTERVAL_SECS)).await;
        }
    });

    commands.spawn((
        StatusPoller {
            source_name,
            poll_interval_secs: STATUS_POLL_INTERVAL_SECS,
        },
        StatusChannel {
            receiver: status_rx,
        },
    ));

    // ============= Forecast Poller Worker =============

    let (forecast_tx, forecast_rx) = crossbeam_channel::bounded(FORECAST_CHANNEL_CAPACITY);
    let source = forecast_source.0.clone();
    let source_name = source.name().to_string();
    let poll_interval_secs = config.system.update_interval_secs;

    runtime.spawn(async move {
        info!("Forecast poller worker started");
        loop {
            match source.read_forecast().await {
                Ok(entries) => {
                    if entries.is_empty() {
                        warn!("Forecast source returned no entries");
                    } else if let Err(e) = forecast_tx.try_send(entries) {
                        warn!("Failed to send forecast to channel (buffer full?): {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to read weather forecast: {:#}", e);
                }
            }
            Delay::new(Duration::from_secs(poll_interval_secs)).await;
        }
    });

    commands.spawn((
        ForecastPoller {
            source_name,
            poll_interval_secs,
        },
        ForecastChannel {
            receiver: forecast_rx,
        },
    ));

    info!("Collaborator pollers initialized");
}

/// Startup system that restores the persisted learning data and, when the
/// restored window is already large enough, dispatches an initial retrain.
pub fn load_history_system(
    persistence: Res<HistoryPersistenceResource>,
    mut engine_state: ResMut<EngineState>,
    mut trainer: ResMut<TrainerState>,
) {
    match persistence.0.load() {
        Ok(Some(data)) => {
            engine_state
                .engine
                .restore(data.historical_data, data.model_accuracy);

            let samples = engine_state.engine.observations().len();
            if samples >= engine_state.engine.min_samples() {
                info!("Restored {} observations, scheduling initial retrain", samples);
                dispatch_retrain(&mut trainer, &engine_state.engine);
            } else {
                info!(
                    "Restored {} observations ({} needed before learning kicks in)",
                    samples,
                    engine_state.engine.min_samples()
                );
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to load learning data, starting empty: {:#}", e);
        }
    }
}

/// System that polls the status channel and keeps the latest snapshot.
pub fn poll_status_channel(
    status_channel: Query<&StatusChannel>,
    mut latest: ResMut<LatestStatus>,
) {
    let Ok(channel) = status_channel.single() else {
        return; // No poller entity yet
    };

    // NON-BLOCKING: drain whatever has arrived; newest snapshot wins.
    while let Ok(status) = channel.receiver.try_recv() {
        latest.status = Some(status);
        latest.received_at = Some(Utc::now());
    }
}

/// System that polls the forecast channel and keeps the latest horizon.
pub fn poll_forecast_channel(
    forecast_channel: Query<&ForecastChannel>,
    mut latest: ResMut<LatestForecast>,
) {
    let Ok(channel) = forecast_channel.single() else {
        return;
    };

    while let Ok(entries) = channel.receiver.try_recv() {
        debug!("Forecast updated: {} hourly entries", entries.len());
        latest.entries = entries;
        latest.received_at = Some(Utc::now());
    }
}

/// The control cycle itself, gated on the configured interval and on the
/// post-failure cooldown.
#[expect(clippy::too_many_arguments)]
pub fn control_cycle_system(
    config: Res<AppConfig>,
    runtime: Res<AsyncRuntime>,
    commander: Res<CommanderResource>,
    command_results: Res<CommandResultChannel>,
    persistence: Res<HistoryPersistenceResource>,
    latest_status: Res<LatestStatus>,
    latest_forecast: Res<LatestForecast>,
    mut engine_state: ResMut<EngineState>,
    mut cycle_state: ResMut<CycleState>,
    mut trainer: ResMut<TrainerState>,
) {
    let now_instant = Instant::now();

    if let Some(until) = cycle_state.cooldown_until {
        if now_instant < until {
            return;
        }
        cycle_state.cooldown_until = None;
    }

    if let Some(last) = cycle_state.last_cycle
        && now_instant.duration_since(last) < Duration::from_secs(config.system.update_interval_secs)
    {
        return;
    }

    // Readiness checks come before the interval is charged, so the first
    // real cycle runs as soon as both collaborators have delivered.
    let Some(status) = latest_status.status.clone() else {
        return;
    };
    if latest_forecast.entries.is_empty() {
        return;
    }

    cycle_state.last_cycle = Some(now_instant);

    let now = Utc::now();
    if let Some(received_at) = latest_status.received_at
        && (now - received_at).num_seconds() > STALE_STATUS_WARN_SECS
    {
        warn!(
            "No fresh telemetry for {}s, deciding on a stale snapshot",
            (now - received_at).num_seconds()
        );
    }

    let EngineState { engine, params } = &mut *engine_state;

    match run_cycle(now, &config, params, engine, &status, &latest_forecast.entries) {
        Ok(outcome) => {
            if outcome.decision.action_needed {
                info!(
                    "Applying new settings: target={:?} [{}]",
                    outcome.decision.settings.target_temperature,
                    outcome.decision.reasoning.join("; ")
                );

                let commander = commander.0.clone();
                let settings = outcome.decision.settings;
                let tx = command_results.sender.clone();
                runtime.spawn(async move {
                    let _ = tx.send(commander.apply_settings(&settings).await);
                });
            } else {
                debug!("No action needed this cycle");
            }

            if outcome.retrain_due {
                dispatch_retrain(&mut trainer, engine);
            }

            if outcome.save_due {
                flush_history(engine, &config, &persistence);
            }

            let report = algorithm_status(&config, params, engine);
            debug!(
                "Algorithm status: lag={:.1}h solar={:.2} wind={:.2} confidence={:.2} samples={}",
                report.params.thermal_lag_hours,
                report.params.solar_gain_factor,
                report.params.wind_factor,
                report.learning_confidence,
                report.historical_data_points
            );
        }
        Err(e) => {
            error!(
                "Control cycle failed ({e}); no action this cycle, retrying in {}s",
                config.system.cooldown_secs
            );
            cycle_state.cooldown_until =
                Some(now_instant + Duration::from_secs(config.system.cooldown_secs));
        }
    }
}

/// System that installs finished model generations and dispatches the
/// follow-up retrain when appends landed mid-training.
pub fn poll_trainer_results(
    mut engine_state: ResMut<EngineState>,
    mut trainer: ResMut<TrainerState>,
) {
    while let Ok(registry) = trainer.result_rx.try_recv() {
        engine_state.engine.install_registry(registry);
        trainer.in_flight = false;
        info!(
            "Installed new model generation (confidence {:.2})",
            engine_state.engine.confidence()
        );
    }

    if !trainer.in_flight
        && trainer.dirty
        && engine_state.engine.observations().len() >= engine_state.engine.min_samples()
    {
        dispatch_retrain(&mut trainer, &engine_state.engine);
    }
}

/// System that logs the outcomes of dispatched actuator commands.
pub fn poll_command_results(command_results: Res<CommandResultChannel>) {
    while let Ok(result) = command_results.receiver.try_recv() {
        match result {
            Ok(()) => debug!("Setpoint command applied"),
            Err(e) => error!("Setpoint command failed: {:#}", e),
        }
    }
}

/// System that reacts to the shutdown signal: flush the learning data,
/// then leave. The schedule runner has no external stop handle, so exiting
/// here after the flush is the clean path out.
pub fn shutdown_system(
    shutdown: Option<Res<ShutdownChannel>>,
    config: Res<AppConfig>,
    persistence: Res<HistoryPersistenceResource>,
    engine_state: Res<EngineState>,
) {
    let Some(channel) = shutdown else {
        return;
    };

    if channel.receiver.try_recv().is_ok() {
        info!("Shutdown signal received, flushing learning data");
        flush_history(&engine_state.engine, &config, &persistence);
        info!("Shutdown complete");
        std::process::exit(0);
    }
}

fn dispatch_retrain(trainer: &mut TrainerState, engine: &LearningEngine) {
    if trainer.in_flight {
        trainer.dirty = true;
        return;
    }

    let job = TrainJob {
        observations: engine.observations().snapshot(),
        previous: engine.registry().clone(),
    };

    match trainer.job_tx.send(job) {
        Ok(()) => {
            trainer.in_flight = true;
            trainer.dirty = false;
        }
        Err(e) => {
            error!("Failed to dispatch retrain job: {}", e);
        }
    }
}

fn flush_history(
    engine: &LearningEngine,
    config: &AppConfig,
    persistence: &HistoryPersistenceResource,
) {
    let data = PersistedLearningData::capture(engine, config, Utc::now());
    if let Err(e) = persistence.0.save(&data) {
        error!("Failed to save learning data: {:#}", e);
    }
}
