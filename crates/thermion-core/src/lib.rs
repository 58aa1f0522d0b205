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

pub mod async_runtime;
pub mod async_tasks;
pub mod cycle;
pub mod decision;
pub mod features;
pub mod history;
pub mod learning;
pub mod persistence;
pub mod physical;
pub mod prediction;
pub mod resources;
pub mod systems;
pub mod traits;

pub use async_runtime::*;
pub use async_tasks::*;
use bevy_app::prelude::*;
pub use cycle::{CycleOutcome, algorithm_status, run_cycle};
pub use features::{FEATURE_LEN, FeatureVector, SampleConditions};
pub use history::{MAX_DATA_AGE_DAYS, Observation, ObservationLog};
pub use learning::{
    AdaptationRecommendations, LearningEngine, MIN_SAMPLES_FOR_LEARNING, ModelAccuracy,
    ModelRegistry, PredictionTarget, TrainedModel, blend,
};
pub use persistence::{
    ConfigSnapshot, DEFAULT_DATA_PATH, HistoryPersistence, PersistedLearningData,
};
pub use physical::WeatherImpact;
pub use prediction::{
    ADAPTATION_CONFIDENCE_GATE, AdaptiveParams, AlgorithmStatus, HourlyPrediction, predict_horizon,
};
pub use resources::*;
pub use systems::*;
pub use traits::{ForecastSource, SetpointCommander, StatusSource};

/// Core plugin that registers the engine resources and control systems.
///
/// The binary inserts the configuration, the collaborator handles and the
/// persistence manager before running the app.
pub struct ThermionCorePlugin;

impl Plugin for ThermionCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<resources::LatestStatus>()
            .init_resource::<resources::LatestForecast>()
            .init_resource::<resources::CycleState>()
            .init_resource::<resources::CommandResultChannel>()
            .insert_resource(systems::spawn_trainer())
            .add_systems(
                Startup,
                (systems::load_history_system, systems::setup_async_workers),
            )
            .add_systems(
                Update,
                (
                    systems::poll_status_channel,
                    systems::poll_forecast_channel,
                    systems::poll_trainer_results,
                    systems::control_cycle_system,
                    systems::poll_command_results,
                    systems::shutdown_system,
                ),
            );
    }
}
