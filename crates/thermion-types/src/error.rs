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

use thiserror::Error;

/// Failure kinds a single control cycle can produce.
///
/// The cycle runner maps every variant to the same outcome: log it, emit no
/// action, wait out the cooldown, and let the next cycle try again. A bad
/// cycle never unwinds the controller.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The forecast collaborator returned no entries.
    #[error("no forecast data available")]
    EmptyForecast,

    /// No heat pump status snapshot has arrived yet.
    #[error("no heat pump status available")]
    MissingStatus,

    /// A model evaluation produced an unusable value.
    #[error("model evaluation failed: {0}")]
    Model(String),

    /// Writing or reading the learning data file failed.
    #[error("history persistence failed")]
    Persistence(#[from] std::io::Error),
}
