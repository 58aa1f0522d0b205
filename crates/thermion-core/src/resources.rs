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

//! ECS resources wrapping the engine state and the collaborator handles.

use bevy_ecs::prelude::*;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use crate::history::Observation;
use crate::learning::{LearningEngine, ModelRegistry};
use crate::persistence::HistoryPersistence;
use crate::prediction::AdaptiveParams;
use crate::traits::{ForecastSource, SetpointCommander, StatusSource};
use thermion_types::{AppConfig, CurrentStatus, ForecastEntry};

/// Handle to the heat pump telemetry source.
#[derive(Resource, Clone)]
pub struct StatusSourceResource(pub Arc<dyn StatusSource>);

/// Handle to the weather forecast source.
#[derive(Resource, Clone)]
pub struct ForecastSourceResource(pub Arc<dyn ForecastSource>);

/// Handle to the device-control collaborator.
#[derive(Resource, Clone)]
pub struct CommanderResource(pub Arc<dyn SetpointCommander>);

/// The prediction engine's mutable state: observation log, installed model
/// generation, and the adaptive heuristic coefficients.
///
/// Single-writer: only the control-cycle and trainer-result systems touch
/// this, both on the ECS thread.
#[derive(Resource, Debug)]
pub struct EngineState {
    pub engine: LearningEngine,
    pub params: AdaptiveParams,
}

impl EngineState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            engine: LearningEngine::default(),
            params: AdaptiveParams::from_config(config),
        }
    }
}

/// Most recent status snapshot delivered by the poller.
#[derive(Resource, Debug, Default)]
pub struct LatestStatus {
    pub status: Option<CurrentStatus>,
    pub received_at: Option<DateTime<Utc>>,
}

/// Most recent forecast delivered by the poller.
#[derive(Resource, Debug, Default)]
pub struct LatestForecast {
    pub entries: Vec<ForecastEntry>,
    pub received_at: Option<DateTime<Utc>>,
}

/// Control-cycle pacing: interval gating plus the post-failure cooldown.
#[derive(Resource, Debug, Default)]
pub struct CycleState {
    pub last_cycle: Option<Instant>,
    pub cooldown_until: Option<Instant>,
}

/// Persistence manager for the learning data file.
#[derive(Resource, Debug, Clone)]
pub struct HistoryPersistenceResource(pub HistoryPersistence);

/// A retrain job handed to the background trainer: the full retained window
/// plus the installed generation (carried over for targets that fail to fit).
#[derive(Debug)]
pub struct TrainJob {
    pub observations: Vec<Observation>,
    pub previous: ModelRegistry,
}

/// Channels to and from the background trainer thread, plus the in-flight
/// bookkeeping that bounds the retrain cadence.
///
/// At most one retrain runs at a time; appends that land while one is in
/// flight set `dirty`, and the result handler dispatches the follow-up.
/// Prediction keeps reading the installed generation until a complete new
/// one is swapped in.
#[derive(Resource)]
pub struct TrainerState {
    pub job_tx: Sender<TrainJob>,
    pub result_rx: Receiver<ModelRegistry>,
    pub in_flight: bool,
    pub dirty: bool,
}

/// Results coming back from fire-and-forget commander tasks.
#[derive(Resource)]
pub struct CommandResultChannel {
    pub sender: Sender<anyhow::Result<()>>,
    pub receiver: Receiver<anyhow::Result<()>>,
}

impl CommandResultChannel {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}

impl Default for CommandResultChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown signal channel; the binary wires the sender to SIGINT/SIGTERM.
#[derive(Resource)]
pub struct ShutdownChannel {
    pub receiver: Receiver<()>,
}
