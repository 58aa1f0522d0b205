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

use bevy_ecs::prelude::*;
use crossbeam_channel::Receiver;

use thermion_types::{CurrentStatus, ForecastEntry};

// ============= Status Poller =============

/// Component marking this entity as the status poller worker
#[derive(Component)]
pub struct StatusPoller {
    pub source_name: String,
    pub poll_interval_secs: u64,
}

/// Component that holds a channel receiver for status snapshots
#[derive(Component)]
pub struct StatusChannel {
    pub receiver: Receiver<CurrentStatus>,
}

// ============= Forecast Poller =============

/// Component marking this entity as the forecast poller worker
#[derive(Component)]
pub struct ForecastPoller {
    pub source_name: String,
    pub poll_interval_secs: u64,
}

/// Component that holds a channel receiver for forecast updates
#[derive(Component)]
pub struct ForecastChannel {
    pub receiver: Receiver<Vec<ForecastEntry>>,
}
