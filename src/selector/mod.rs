//! Ambiguity extraction from per-direction solution curves.
//!
//! # Algorithm
//!
//! 1. Scan the objective curve circularly for bins strictly greater than both
//!    neighbours.
//! 2. Rank the peaks by objective (stable, best first) and keep at most
//!    [`SelectorConfig::max_ambiguities`].
//! 3. Grow a non-overlapping confidence interval around each kept peak until
//!    the intervals hold [`SelectorConfig::coverage_fraction`] of the total
//!    pseudo-probability `Σ exp(objective)` (see [`growth`]).
//! 4. Emit one [`AmbiguityCandidate`] per peak, reading speed and secondary
//!    variable from the curves at the peak bin.

pub mod growth;
pub mod maxima;

use tracing::debug;

use crate::angle::AngleInterval;
use crate::cell::WindVectorCell;
use crate::curves::{SolutionCurves, DIRECTION_BINS};
use crate::wind::AmbiguityCandidate;

pub use growth::GrowthReport;

// ── Configuration ───────────────────────────────────────────────────────────

/// Configuration for [`AmbiguitySelector`].
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Maximum number of ambiguities kept per cell. Default: 4.
    pub max_ambiguities: usize,
    /// Fraction of the total pseudo-probability the intervals must capture
    /// before growth stops. Default: 0.99.
    pub coverage_fraction: f32,
    /// Upper bound on growth iterations. Each iteration widens every interval
    /// by at most two bins, so 360 always suffices to fill the circle.
    /// Default: 360.
    pub max_growth_iterations: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_ambiguities: 4,
            coverage_fraction: 0.99,
            max_growth_iterations: DIRECTION_BINS,
        }
    }
}

// ── Selector ────────────────────────────────────────────────────────────────

/// Builds wind vector cells from raw solution curves.
#[derive(Debug, Clone, Default)]
pub struct AmbiguitySelector {
    pub config: SelectorConfig,
}

impl AmbiguitySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Extract ambiguities from `curves` and wrap both in a new cell.
    ///
    /// A curve without local maxima yields a cell with no ambiguities.
    pub fn build_solutions(&self, curves: SolutionCurves) -> WindVectorCell {
        self.build_solutions_with_report(curves).0
    }

    /// Like [`build_solutions`](Self::build_solutions), also returning how far
    /// interval growth got.
    pub fn build_solutions_with_report(
        &self,
        curves: SolutionCurves,
    ) -> (WindVectorCell, GrowthReport) {
        let objective = curves.objective();
        let peaks = maxima::rank_peaks(
            objective,
            maxima::local_maxima(objective),
            self.config.max_ambiguities,
        );
        if peaks.is_empty() {
            debug!("No local maxima in objective curve");
            return (WindVectorCell::new(curves, Vec::new()), GrowthReport::empty());
        }

        let (intervals, report) = growth::grow_intervals(
            objective,
            &peaks,
            self.config.coverage_fraction,
            self.config.max_growth_iterations,
        );

        let ambiguities = peaks
            .iter()
            .zip(&intervals)
            .map(|(&bin, iv)| AmbiguityCandidate {
                speed: curves.speed()[bin],
                direction: SolutionCurves::bin_direction(bin),
                secondary: curves.secondary()[bin],
                objective: objective[bin],
                direction_range: AngleInterval::from_bins(iv.left, iv.right, DIRECTION_BINS),
            })
            .collect();

        (WindVectorCell::new(curves, ambiguities), report)
    }
}
