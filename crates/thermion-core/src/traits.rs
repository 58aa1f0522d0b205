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

//! Collaborator boundaries.
//!
//! The engine never talks to a broker, a weather API or a device directly;
//! it consumes these traits. Implementations own their transports and their
//! timeouts — nothing here blocks indefinitely on the engine's behalf.

use anyhow::Result;
use async_trait::async_trait;
use thermion_types::{ControlSettings, CurrentStatus, ForecastEntry};

/// Source of heat pump telemetry snapshots.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Read the most recent status snapshot.
    async fn read_status(&self) -> Result<CurrentStatus>;

    /// Data source name for logging.
    fn name(&self) -> &str;
}

/// Source of hourly weather forecasts.
///
/// Implementations return entries ordered by increasing timestamp, at least
/// one entry per successful read.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn read_forecast(&self) -> Result<Vec<ForecastEntry>>;

    /// Data source name for logging.
    fn name(&self) -> &str;
}

/// Sink for control decisions.
///
/// Implementations map settings to actuator commands. They are expected to
/// reject out-of-range setpoints (15-30 °C) locally rather than forwarding
/// them to the device.
#[async_trait]
pub trait SetpointCommander: Send + Sync {
    async fn apply_settings(&self, settings: &ControlSettings) -> Result<()>;

    /// Commander name for logging.
    fn name(&self) -> &str;
}
