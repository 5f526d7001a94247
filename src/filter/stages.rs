//! The standard staging policy: confident ocean cells settle first, then
//! low-wind and rainy ocean, then land/ice contaminated cells, and finally a
//! DIRTH smoothing stage over everything.

use super::{CellRoles, FilterMode, Stage};
use crate::cell::WindVectorCell;

/// Classification of a cell for staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellClass {
    /// Open water, best ambiguity at or above the low-wind speed, no usable rain flag.
    HighWindOcean,
    /// Open water that is slow or raining.
    LowWindOcean,
    /// Land, ice or coastal contamination.
    LandIce,
}

#[derive(Debug, Clone, Copy)]
pub struct StagingPolicy {
    /// Best-ambiguity speed (m/s) below which an ocean cell is low-wind. Default: 3.0.
    pub low_wind_speed: f32,
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self { low_wind_speed: 3.0 }
    }
}

impl StagingPolicy {
    pub fn classify(&self, cell: &WindVectorCell) -> CellClass {
        if cell.flags.is_land_or_ice() {
            return CellClass::LandIce;
        }
        let best_speed = cell
            .ranked_indices()
            .first()
            .map(|&i| cell.ambiguities()[i].speed);
        match best_speed {
            Some(s) if s >= self.low_wind_speed && !cell.flags.is_raining() => {
                CellClass::HighWindOcean
            }
            _ => CellClass::LowWindOcean,
        }
    }

    /// The four stages `high-wind ocean`, `low-wind ocean`, `land/ice` and `dirth`.
    pub fn stages(&self) -> Vec<Stage> {
        let policy = *self;
        vec![
            Stage::new("high-wind ocean", FilterMode::Standard, move |cell| {
                match policy.classify(cell) {
                    CellClass::HighWindOcean => CellRoles::ALL,
                    _ => CellRoles::INERT,
                }
            }),
            Stage::new("low-wind ocean", FilterMode::Standard, move |cell| {
                match policy.classify(cell) {
                    CellClass::LowWindOcean => CellRoles::ALL,
                    CellClass::HighWindOcean => CellRoles::INFLUENTIAL_ONLY,
                    CellClass::LandIce => CellRoles::INERT,
                }
            }),
            Stage::new("land/ice", FilterMode::Standard, move |cell| {
                match policy.classify(cell) {
                    CellClass::LandIce => CellRoles::ALL,
                    _ => CellRoles::INFLUENTIAL_ONLY,
                }
            }),
            Stage::all("dirth", FilterMode::Dirth),
        ]
    }
}
