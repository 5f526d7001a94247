//! Staged spatial consensus filtering ("median filter") over a swath.
//!
//! The filter runs a sequence of [`Stage`]s. Each stage assigns every cell a
//! set of [`CellRoles`] once, then repeats filter passes until a pass changes
//! nothing or [`FilterConfig::max_passes`] is reached.
//!
//! # Pass structure
//!
//! 1. **Scan** (read-only): every filterable, changeable cell with at least
//!    one active and one influential cell in its window computes a tentative
//!    selection from its influential neighbours.
//!    - [`FilterMode::Standard`]: the ambiguity with the smallest summed
//!      vector distance to the neighbours' selections.
//!    - [`FilterMode::Dirth`]: the component-wise median of the neighbours'
//!      selections, turned into a direction, clamped to the range of the
//!      cell's selected ambiguity and re-sampled from the cell's curves.
//! 2. **Commit**: tentatives are applied in a second step, so the result of a
//!    pass does not depend on scan order. Cells that flipped become the
//!    active set of the next pass.

pub mod median;
mod pass;
pub mod stages;

use std::f32::consts::PI;
use std::fmt;

use anyhow::ensure;
use tracing::{debug, info};

use crate::cell::WindVectorCell;
use crate::swath::SwathGrid;

pub use stages::{CellClass, StagingPolicy};

// ── Configuration ───────────────────────────────────────────────────────────

/// How DIRTH summarises the neighbour vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirthCenter {
    /// Component-wise median.
    #[default]
    Median,
    /// Vector mean.
    Mean,
}

/// Configuration for [`ConsensusFilter`].
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Half-width of the square filter window in cells. Default: 3 (7×7 window).
    pub half_window: usize,
    /// Maximum passes per stage. Default: 200.
    pub max_passes: usize,
    /// Cross-track cells excluded from every window at each swath edge. Default: 0.
    pub cross_track_bound: usize,
    /// Whether the cell being filtered counts among its own neighbours. Default: true.
    pub include_center: bool,
    /// Neighbour selections slower than this (m/s) are ignored. Default: 0.0.
    ///
    /// Only contributors are filtered. A cell whose own new selection is
    /// slower than this still takes it, so calm cells follow faster neighbours.
    pub min_neighbor_speed: f32,
    /// DIRTH changes smaller than this (radians) do not count as flips. Default: 5°.
    pub dirth_flip_threshold: f32,
    /// Centre estimator for DIRTH. Default: [`DirthCenter::Median`].
    pub dirth_center: DirthCenter,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            half_window: 3,
            max_passes: 200,
            cross_track_bound: 0,
            include_center: true,
            min_neighbor_speed: 0.0,
            dirth_flip_threshold: 5.0_f32.to_radians(),
            dirth_center: DirthCenter::Median,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.max_passes > 0, "max_passes must be at least 1");
        ensure!(
            self.dirth_flip_threshold.is_finite()
                && (0.0..=PI).contains(&self.dirth_flip_threshold),
            "dirth_flip_threshold must lie in [0, π], got {}",
            self.dirth_flip_threshold
        );
        ensure!(
            self.min_neighbor_speed.is_finite() && self.min_neighbor_speed >= 0.0,
            "min_neighbor_speed must be a non-negative number, got {}",
            self.min_neighbor_speed
        );
        Ok(())
    }
}

// ── Stages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Pick the ambiguity closest to the neighbours' vectors.
    Standard,
    /// Smooth the direction inside the selected ambiguity's range.
    Dirth,
}

/// What a cell may do during one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRoles {
    /// The cell's selection may be replaced.
    pub changeable: bool,
    /// The cell is re-evaluated.
    pub filterable: bool,
    /// The cell's selection is evidence for its neighbours.
    pub influential: bool,
}

impl CellRoles {
    pub const ALL: CellRoles = CellRoles {
        changeable: true,
        filterable: true,
        influential: true,
    };
    pub const INFLUENTIAL_ONLY: CellRoles = CellRoles {
        changeable: false,
        filterable: false,
        influential: true,
    };
    pub const INERT: CellRoles = CellRoles {
        changeable: false,
        filterable: false,
        influential: false,
    };

    pub fn updatable(&self) -> bool {
        self.changeable && self.filterable
    }
}

type RoleFn = Box<dyn Fn(&WindVectorCell) -> CellRoles + Send + Sync>;

/// One named filtering stage.
pub struct Stage {
    pub name: String,
    pub mode: FilterMode,
    roles: RoleFn,
}

impl Stage {
    pub fn new<F>(name: impl Into<String>, mode: FilterMode, roles: F) -> Self
    where
        F: Fn(&WindVectorCell) -> CellRoles + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            mode,
            roles: Box::new(roles),
        }
    }

    /// A stage in which every cell has every role.
    pub fn all(name: impl Into<String>, mode: FilterMode) -> Self {
        Self::new(name, mode, |_| CellRoles::ALL)
    }

    pub fn roles_of(&self, cell: &WindVectorCell) -> CellRoles {
        (self.roles)(cell)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub name: String,
    pub mode: FilterMode,
    /// Passes executed.
    pub passes: usize,
    /// Flips counted in each pass.
    pub flips: Vec<usize>,
    /// The last pass had no flips.
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    pub stages: Vec<StageReport>,
}

impl FilterReport {
    pub fn total_passes(&self) -> usize {
        self.stages.iter().map(|s| s.passes).sum()
    }

    pub fn converged(&self) -> bool {
        self.stages.iter().all(|s| s.converged)
    }
}

// ── Filter ──────────────────────────────────────────────────────────────────

/// Multi-stage consensus filter.
#[derive(Debug)]
pub struct ConsensusFilter {
    pub config: FilterConfig,
    pub stages: Vec<Stage>,
}

impl ConsensusFilter {
    pub fn new(config: FilterConfig, stages: Vec<Stage>) -> Self {
        Self { config, stages }
    }

    /// Filter with the stages of `policy`.
    pub fn with_policy(config: FilterConfig, policy: &StagingPolicy) -> Self {
        Self::new(config, policy.stages())
    }

    /// Run every stage in order on `grid`.
    pub fn run(&self, grid: &mut SwathGrid) -> anyhow::Result<FilterReport> {
        self.config.validate()?;
        let mut report = FilterReport::default();
        for stage in &self.stages {
            report.stages.push(self.run_stage(stage, grid)?);
        }
        info!(
            "Filter finished: {} stages, {} passes in total",
            report.stages.len(),
            report.total_passes()
        );
        Ok(report)
    }

    /// Run one stage to convergence or until the pass limit.
    pub fn run_stage(&self, stage: &Stage, grid: &mut SwathGrid) -> anyhow::Result<StageReport> {
        self.config.validate()?;
        let roles = pass::RoleMap::evaluate(grid, stage);
        let mut active = roles.initially_active();
        let mut flips = Vec::new();
        let mut converged = false;

        while flips.len() < self.config.max_passes {
            let tentatives = pass::scan(grid, &roles, &active, stage.mode, &self.config);
            let flipped = pass::commit(grid, tentatives, stage.mode, &self.config);
            let count = flipped.iter().filter(|&&f| f).count();
            debug!("Stage '{}' pass {}: {} flips", stage.name, flips.len() + 1, count);
            flips.push(count);
            if count == 0 {
                converged = true;
                break;
            }
            active = flipped;
        }

        info!(
            "Stage '{}' ({:?}): {} passes, converged: {}",
            stage.name,
            stage.mode,
            flips.len(),
            converged
        );
        Ok(StageReport {
            name: stage.name.clone(),
            mode: stage.mode,
            passes: flips.len(),
            flips,
            converged,
        })
    }
}
